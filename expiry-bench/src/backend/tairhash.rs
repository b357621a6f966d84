//! TairHash module. Expiry arguments are in milliseconds.

use super::{Backend, TemplateArgs};
use crate::scenario::ExpiryMode;

pub struct TairHash;

impl Backend for TairHash {
    fn name(&self) -> &'static str {
        "tairhash"
    }

    fn populate_template(&self, args: &TemplateArgs<'_>) -> String {
        format!("EXHSET {} {} {}", args.key, args.field, args.value)
    }

    fn expire_template(&self, args: &TemplateArgs<'_>) -> String {
        let command = match args.expiry {
            ExpiryMode::Relative { .. } => "EXHPEXPIRE",
            ExpiryMode::Absolute { .. } => "EXHPEXPIREAT",
        };
        format!(
            "{command} {} {} {}",
            args.key,
            args.field,
            args.expiry.millis_value()
        )
    }

    fn ttl_template(&self, args: &TemplateArgs<'_>) -> String {
        format!("EXHTTL {} {}", args.key, args.field)
    }

    fn delete_template(&self, args: &TemplateArgs<'_>) -> String {
        format!("EXHDEL {} {}", args.key, args.field)
    }
}
