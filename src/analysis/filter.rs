use crate::analysis::token::Token;

/// Per-token transformation applied after tokenization. Returning `None`
/// drops the token; its position is not reused, so phrase offsets survive.
pub trait TokenFilter: Send + Sync {
    fn filter(&self, token: Token) -> Option<Token>;

    fn name(&self) -> &str;

    fn clone_box(&self) -> Box<dyn TokenFilter>;
}
