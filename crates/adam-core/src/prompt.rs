//! Prompt template for retrieval-augmented answers.

/// Join retrieved documents one per line
pub fn format_context(documents: &[String]) -> String {
    documents.join("\n")
}

/// Combine the user question with retrieved context in the fixed template
pub fn build_prompt(query: &str, documents: &[String]) -> String {
    format!(
        "[User Question]: {} [Relevant Info]: {} [Answer]:",
        query,
        format_context(documents)
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_build_prompt() {
        let docs = vec!["Paris is in France".to_string(), "Lyon too".to_string()];
        assert_eq!(
            build_prompt("Where is Paris?", &docs),
            "[User Question]: Where is Paris? [Relevant Info]: Paris is in France\nLyon too [Answer]:"
        );
    }

    #[test]
    fn test_build_prompt_without_context() {
        assert_eq!(
            build_prompt("Hi", &[]),
            "[User Question]: Hi [Relevant Info]:  [Answer]:"
        );
    }
}
