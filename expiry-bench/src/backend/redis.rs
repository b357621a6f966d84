//! Redis with native hash-field expiration.

use super::{Backend, TemplateArgs};
use crate::scenario::ExpiryMode;

pub struct RedisHfe;

impl Backend for RedisHfe {
    fn name(&self) -> &'static str {
        "redis"
    }

    fn populate_template(&self, args: &TemplateArgs<'_>) -> String {
        format!("HSET {} {} {}", args.key, args.field, args.value)
    }

    fn expire_template(&self, args: &TemplateArgs<'_>) -> String {
        match args.expiry {
            ExpiryMode::Relative { seconds } => {
                format!("HEXPIRE {} {} FIELDS 1 {}", args.key, seconds, args.field)
            }
            ExpiryMode::Absolute { unix_seconds } => {
                format!("HEXPIREAT {} {} FIELDS 1 {}", args.key, unix_seconds, args.field)
            }
        }
    }

    fn ttl_template(&self, args: &TemplateArgs<'_>) -> String {
        format!("HTTL {} FIELDS 1 {}", args.key, args.field)
    }

    fn delete_template(&self, args: &TemplateArgs<'_>) -> String {
        format!("HDEL {} {}", args.key, args.field)
    }
}
