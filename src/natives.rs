use std::time::{SystemTime, UNIX_EPOCH};

use crate::error::RuntimeError;
use crate::objects::object_native::NativeFn;
use crate::value::Value;

/// `clock()` — seconds since the Unix epoch as a float, matching clox's
/// native clock (itself `clock() / CLOCKS_PER_SEC`); a monotonic wall-clock
/// reading is what test scripts actually rely on, not the C library's exact
/// epoch choice.
pub fn clock(_args: &[Value]) -> Result<Value, RuntimeError> {
    let now = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map_err(|_| RuntimeError::new("system clock is before the Unix epoch"))?;
    Ok(Value::Number(now.as_secs_f64()))
}

/// Name, arity and function pointer for every native the VM installs into
/// globals at startup.
pub const NATIVES: &[(&str, u8, NativeFn)] = &[("clock", 0, clock)];

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn clock_returns_a_number() {
        let result = clock(&[]).unwrap();
        assert!(matches!(result, Value::Number(n) if n > 0.0));
    }
}
