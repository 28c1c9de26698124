use tantivy::tokenizer::{LowerCaser, SimpleTokenizer, TextAnalyzer, TokenStream};

/// Lowercasing tokenizer splitting on non-alphanumeric characters.
///
/// Built on tantivy's analyzer chain; indexing and querying must go through
/// the same instance so both sides agree on terms.
#[derive(Clone)]
pub struct LexicalTokenizer {
    analyzer: TextAnalyzer,
}

impl Default for LexicalTokenizer {
    fn default() -> Self {
        let analyzer = TextAnalyzer::builder(SimpleTokenizer::default())
            .filter(LowerCaser)
            .build();
        Self { analyzer }
    }
}

impl LexicalTokenizer {
    pub fn tokenize(&self, text: &str) -> Vec<String> {
        let mut analyzer = self.analyzer.clone();
        let mut stream = analyzer.token_stream(text);
        let mut tokens = Vec::new();
        while stream.advance() {
            tokens.push(stream.token().text.clone());
        }
        tokens
    }
}
