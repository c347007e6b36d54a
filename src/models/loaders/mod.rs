pub mod toml_loader;

pub use toml_loader::{load_quote_form, parse_quote_form};
