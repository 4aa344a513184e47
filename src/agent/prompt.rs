use crate::llm::ChatRequest;
use crate::retriever::ExampleRecord;
use crate::tools::Catalog;

/// Generation stops here so the loop, not the model, supplies observations.
pub const STOP_SEQUENCE: &str = "\nObservation:";

/// Appended to the scratchpad when the loop asks for a best-guess answer.
pub const FINAL_ANSWER_NUDGE: &str =
    "\n\nI now need to return a final answer based on the previous steps:";

/// The fixed part of every model request for one routing call.
#[derive(Debug, Clone)]
pub struct Prompt {
    pub system: String,
    pub question: String,
}

impl Prompt {
    /// Build the system instructions: tool list, grammar, examples, then the query.
    pub fn build(query: &str, examples: &[&ExampleRecord], catalog: &Catalog) -> Self {
        let names = catalog.names().join(", ");
        let mut system = String::new();

        system.push_str(
            "You are a spatial analysis assistant. Use ONLY ONE of the tools provided to answer the question.\n\
             Do NOT guess. Only choose a tool if the query clearly matches its use.\n\
             Never invent a tool: the Action must be exactly one of the tool names listed below.\n\n",
        );

        system.push_str("You have access to the following tools:\n\n");
        for capability in catalog.iter() {
            system.push_str(&format!("{}: {}\n", capability.name, capability.guideline));
        }

        system.push_str(&format!(
            "\nUse the following format:\n\n\
             Question: the input question you must answer\n\
             Thought: you should always think about what to do\n\
             Action: the action to take, should be one of [{}]\n\
             Action Input: the input to the action\n\
             Observation: the result of the action\n\
             ... (this Thought/Action/Action Input/Observation can repeat N times)\n\
             Thought: I now know the final answer\n\
             Final Answer: the final answer to the original input question\n\n",
            names
        ));

        if !examples.is_empty() {
            system.push_str("Here are examples of queries and correct tools:\n");
            for example in examples {
                system.push_str(&format!(
                    "User: {}\nThought: {}\nTool Chosen: {}\nSummary: {}\n\n",
                    example.query, example.reasoning, example.tool_name, example.summary
                ));
            }
        }

        system.push_str(&format!("Now answer this new query:\nQuery: {}", query));

        Self {
            system,
            question: query.to_string(),
        }
    }

    /// One model request carrying the scratchpad of earlier turns.
    pub fn request(&self, scratchpad: &str, temperature: f32) -> ChatRequest {
        ChatRequest {
            system_prompt: self.system.clone(),
            user_prompt: format!("Question: {}\nThought:{}", self.question, scratchpad),
            temperature,
            stop: vec![STOP_SEQUENCE.to_string()],
        }
    }
}
