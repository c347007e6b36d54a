pub mod loaders;
pub mod quote;

pub use loaders::{load_quote_form, parse_quote_form};
pub use quote::{QuoteForm, QuoteLineItem, QuoteTotals};
