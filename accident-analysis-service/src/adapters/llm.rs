use anyhow::anyhow;
use reqwest::Client;
use rig::{agent::Agent, client::CompletionClient, providers::openrouter};
use serde_json::{Value, json};

pub const CHAT_COMPLETIONS_URL: &str = "https://openrouter.ai/api/v1/chat/completions";

/// Build a preconfigured agent for the plain-text inference calls.
pub fn build_agent(
    api_key: &str,
    model: &str,
    preamble: &str,
) -> Agent<openrouter::CompletionModel> {
    let client = openrouter::Client::new(api_key);
    client.agent(model).preamble(preamble).build()
}

/// Call the chat-completions endpoint with a system prompt and multimodal
/// user content, requesting a strict JSON object response.
pub async fn call_json_completion(
    api_key: &str,
    model: &str,
    system_prompt: &str,
    user_content: Vec<Value>,
    max_tokens: u32,
) -> anyhow::Result<String> {
    let client = Client::new();

    let payload = json!({
        "model": model,
        "messages": [
            {
                "role": "system",
                "content": system_prompt
            },
            {
                "role": "user",
                "content": user_content
            }
        ],
        "response_format": { "type": "json_object" },
        "max_tokens": max_tokens
    });

    let response = client
        .post(CHAT_COMPLETIONS_URL)
        .header("Authorization", format!("Bearer {}", api_key))
        .header("Content-Type", "application/json")
        .json(&payload)
        .send()
        .await?;

    if !response.status().is_success() {
        return Err(anyhow!("LLM API request failed: {}", response.status()));
    }

    let response_json: Value = response.json().await?;

    let content = response_json["choices"][0]["message"]["content"]
        .as_str()
        .ok_or_else(|| anyhow!("Invalid response format from LLM"))?;

    Ok(content.to_string())
}

/// Cut the outermost JSON object out of a model response that may wrap it in
/// prose or a code fence. Returns the input unchanged when no braces are
/// found, leaving the parse error to the caller.
pub fn extract_json_object(response: &str) -> &str {
    match (response.find('{'), response.rfind('}')) {
        (Some(start), Some(end)) if end > start => &response[start..=end],
        _ => response,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extracts_object_from_fenced_response() {
        let response = "```json\n{\"confidence_score\": 95}\n```";
        assert_eq!(extract_json_object(response), "{\"confidence_score\": 95}");
    }

    #[test]
    fn passes_through_bare_object_and_garbage() {
        assert_eq!(extract_json_object("{\"a\":1}"), "{\"a\":1}");
        assert_eq!(extract_json_object("no json here"), "no json here");
    }
}
