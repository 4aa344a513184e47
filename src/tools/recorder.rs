use std::sync::Mutex;

use crate::geo::RasterResult;

/// One capability run observed during a routing call.
#[derive(Debug, Clone)]
pub struct Invocation {
    pub tool: &'static str,
    /// The `Action Input` text the model supplied.
    pub input: String,
    /// `None` until the backend returned a raster.
    pub result: Option<RasterResult>,
}

/// Records which capabilities fired during a single routing call.
///
/// Created per call and dropped with it, so overlapping calls never see each
/// other's invocations. Only the last invocation is trusted for resolution.
#[derive(Debug, Default)]
pub struct InvocationRecorder {
    invocations: Mutex<Vec<Invocation>>,
}

impl InvocationRecorder {
    pub fn new() -> Self {
        Self::default()
    }

    fn with<T>(&self, f: impl FnOnce(&mut Vec<Invocation>) -> T) -> T {
        let mut guard = self
            .invocations
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        f(&mut guard)
    }

    /// Note that `tool` is about to run. Returns the slot to complete later.
    pub fn begin(&self, tool: &'static str, input: &str) -> usize {
        self.with(|invocations| {
            invocations.push(Invocation {
                tool,
                input: input.to_string(),
                result: None,
            });
            invocations.len() - 1
        })
    }

    pub fn complete(&self, slot: usize, result: RasterResult) {
        self.with(|invocations| {
            if let Some(invocation) = invocations.get_mut(slot) {
                invocation.result = Some(result);
            }
        })
    }

    /// Name of the most recently started capability.
    #[cfg(test)]
    pub fn last_tool(&self) -> Option<&'static str> {
        self.with(|invocations| invocations.last().map(|i| i.tool))
    }

    #[cfg(test)]
    pub fn last(&self) -> Option<Invocation> {
        self.with(|invocations| invocations.last().cloned())
    }

    #[cfg(test)]
    pub fn len(&self) -> usize {
        self.with(|invocations| invocations.len())
    }

    #[cfg(test)]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Consume the recorder, yielding every invocation in call order.
    pub fn into_invocations(self) -> Vec<Invocation> {
        self.invocations
            .into_inner()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geo::{Expr, Region};

    fn raster(handle: &str) -> RasterResult {
        RasterResult {
            handle: handle.to_string(),
            expression: Expr::image("test/asset"),
            region: Region::from_km(0.0, 0.0, 30),
        }
    }

    #[test]
    fn test_last_invocation_wins() {
        let recorder = InvocationRecorder::new();
        let first = recorder.begin("get_ndvi_mask", "green cover");
        recorder.complete(first, raster("a"));
        let second = recorder.begin("get_land_cover", "land cover");

        assert_eq!(recorder.len(), 2);
        assert_eq!(recorder.last_tool(), Some("get_land_cover"));
        // Started but not yet completed.
        assert!(recorder.last().unwrap().result.is_none());

        recorder.complete(second, raster("b"));
        assert_eq!(recorder.last().unwrap().result.unwrap().handle, "b");
    }

    #[test]
    fn test_empty_recorder() {
        let recorder = InvocationRecorder::new();
        assert!(recorder.is_empty());
        assert_eq!(recorder.last_tool(), None);
    }
}
