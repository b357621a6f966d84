//! KeyDB subkey expiration.

use super::{Backend, TemplateArgs};
use crate::scenario::ExpiryMode;

pub struct KeyDb;

impl Backend for KeyDb {
    fn name(&self) -> &'static str {
        "keydb"
    }

    fn populate_template(&self, args: &TemplateArgs<'_>) -> String {
        format!("HSET {} {} {}", args.key, args.field, args.value)
    }

    fn expire_template(&self, args: &TemplateArgs<'_>) -> String {
        let command = match args.expiry {
            ExpiryMode::Relative { .. } => "EXPIREMEMBER",
            ExpiryMode::Absolute { .. } => "EXPIREMEMBERAT",
        };
        format!(
            "{command} {} {} {}",
            args.key,
            args.field,
            args.expiry.seconds_value()
        )
    }

    // KeyDB overloads TTL with an optional subkey argument.
    fn ttl_template(&self, args: &TemplateArgs<'_>) -> String {
        format!("TTL {} {}", args.key, args.field)
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
    fn member_expire_commands() {
        let naming = KeyFieldNaming {
            container_key: "__key__".into(),
            field: "abcdEFGH".into(),
        };
        let relative = TemplateArgs::new(&naming, ExpiryMode::Relative { seconds: 3 });
        assert_eq!(KeyDb.expire_template(&relative), "EXPIREMEMBER __key__ abcdEFGH 3");
        assert_eq!(KeyDb.ttl_template(&relative), "TTL __key__ abcdEFGH");

        let absolute = TemplateArgs::new(&naming, ExpiryMode::Absolute { unix_seconds: 99 });
        assert_eq!(KeyDb.expire_template(&absolute), "EXPIREMEMBERAT __key__ abcdEFGH 99");
    }

    #[test]
    fn oversized_relative_expiry_never_goes_negative() {
        let naming = KeyFieldNaming {
            container_key: "myhash".into(),
            field: "__key__".into(),
        };
        let args = TemplateArgs::new(&naming, ExpiryMode::Relative { seconds: u64::MAX });
        assert_eq!(
            KeyDb.expire_template(&args),
            format!("EXPIREMEMBER myhash __key__ {}", i64::MAX)
        );
    }
}
