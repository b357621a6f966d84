//! Reference backend: expiry set on the whole container with `EXPIRE`.
//!
//! The field identity is ignored by the expire and TTL commands, so in the
//! single-container topology every expire call hits the same key.

use super::{Backend, TemplateArgs};
use crate::scenario::ExpiryMode;

pub struct RedisKeyExpire;

impl Backend for RedisKeyExpire {
    fn name(&self) -> &'static str {
        "redis-expire"
    }

    fn populate_template(&self, args: &TemplateArgs<'_>) -> String {
        format!("HSET {} {} {}", args.key, args.field, args.value)
    }

    fn expire_template(&self, args: &TemplateArgs<'_>) -> String {
        match args.expiry {
            ExpiryMode::Relative { seconds } => format!("EXPIRE {} {seconds}", args.key),
            ExpiryMode::Absolute { unix_seconds } => format!("EXPIREAT {} {unix_seconds}", args.key),
        }
    }

    fn ttl_template(&self, args: &TemplateArgs<'_>) -> String {
        format!("TTL {}", args.key)
    }

    fn delete_template(&self, args: &TemplateArgs<'_>) -> String {
        format!("HDEL {} {}", args.key, args.field)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scenario::KeyFieldNaming;

    #[test]
    fn field_is_not_part_of_expire_or_ttl() {
        let naming = KeyFieldNaming {
            container_key: "__key__".into(),
            field: "qwertyui".into(),
        };
        let args = TemplateArgs::new(&naming, ExpiryMode::Relative { seconds: 10000 });
        assert_eq!(RedisKeyExpire.expire_template(&args), "EXPIRE __key__ 10000");
        assert_eq!(RedisKeyExpire.ttl_template(&args), "TTL __key__");
        assert!(RedisKeyExpire.delete_template(&args).contains("qwertyui"));

        let absolute = TemplateArgs::new(&naming, ExpiryMode::Absolute { unix_seconds: 5 });
        assert_eq!(RedisKeyExpire.expire_template(&absolute), "EXPIREAT __key__ 5");
    }
}
