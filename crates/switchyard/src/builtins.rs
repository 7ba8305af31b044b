//! Built-in handlers.
//!
//! | Name | Arity | Result |
//! |------|-------|--------|
//! | `core.echo` | any | the arguments, as an array |
//! | `core.fail` | 0-1 | always fails, with the given message |
//! | `math.add` | any | sum (0 for no arguments) |
//! | `math.sub` | 1+ | first argument minus the rest |
//! | `math.mul` | any | product (1 for no arguments) |
//! | `math.div` | 2 | quotient; integer when exact |
//! | `text.upper` | 1 | uppercase string |
//! | `text.lower` | 1 | lowercase string |
//! | `text.concat` | any | strings joined without separator |
//! | `text.len` | 1 | character count |
//!
//! Integer arithmetic is checked; numbers that are not all integers are
//! combined as floats.

use anyhow::{anyhow, bail, Result};
use serde_json::{Number, Value};
use switchyard_dispatch::{Args, Arity, Registry, RegistryError, SimpleFnHandler};

/// Creates a registry holding every built-in handler.
pub fn registry() -> Result<Registry, RegistryError> {
    let mut registry = Registry::new();
    install(&mut registry)?;
    Ok(registry)
}

/// Registers the built-in handlers into `registry`.
pub fn install(registry: &mut Registry) -> Result<(), RegistryError> {
    registry
        .group("core", |g| {
            g.handler(
                "echo",
                SimpleFnHandler::new(|a: &Args| Ok::<_, anyhow::Error>(a.as_slice().to_vec()))
                    .describe("Return the arguments unchanged"),
            )
            .handler(
                "fail",
                SimpleFnHandler::new(fail)
                    .describe("Always fail, optionally with a message")
                    .arity(Arity::between(0, 1)),
            )
        })?
        .group("math", |g| {
            g.handler(
                "add",
                SimpleFnHandler::new(add).describe("Sum the arguments"),
            )
            .handler(
                "sub",
                SimpleFnHandler::new(sub)
                    .describe("Subtract the remaining arguments from the first")
                    .arity(Arity::at_least(1)),
            )
            .handler(
                "mul",
                SimpleFnHandler::new(mul).describe("Multiply the arguments"),
            )
            .handler(
                "div",
                SimpleFnHandler::new(div)
                    .describe("Divide the first argument by the second")
                    .arity(Arity::exact(2)),
            )
        })?
        .group("text", |g| {
            g.handler(
                "upper",
                SimpleFnHandler::new(|a: &Args| {
                    Ok::<_, anyhow::Error>(a.get::<String>(0)?.to_uppercase())
                })
                .describe("Uppercase a string")
                .arity(Arity::exact(1)),
            )
            .handler(
                "lower",
                SimpleFnHandler::new(|a: &Args| {
                    Ok::<_, anyhow::Error>(a.get::<String>(0)?.to_lowercase())
                })
                .describe("Lowercase a string")
                .arity(Arity::exact(1)),
            )
            .handler(
                "concat",
                SimpleFnHandler::new(|a: &Args| {
                    Ok::<_, anyhow::Error>(a.rest::<String>(0)?.concat())
                })
                .describe("Join strings without a separator"),
            )
            .handler(
                "len",
                SimpleFnHandler::new(|a: &Args| {
                    Ok::<_, anyhow::Error>(a.get::<String>(0)?.chars().count())
                })
                .describe("Count the characters of a string")
                .arity(Arity::exact(1)),
            )
        })?;
    Ok(())
}

fn fail(args: &Args) -> Result<()> {
    match args.get_opt::<String>(0)? {
        Some(message) => Err(anyhow!(message)),
        None => bail!("requested failure"),
    }
}

/// Numeric arguments, either all integers or (if any is not) all floats.
enum Operands {
    Ints(Vec<i64>),
    Floats(Vec<f64>),
}

fn operands(args: &Args) -> Result<Operands> {
    let numbers = args.rest::<Number>(0)?;
    if let Some(ints) = numbers.iter().map(Number::as_i64).collect::<Option<Vec<_>>>() {
        return Ok(Operands::Ints(ints));
    }

    numbers
        .iter()
        .map(|n| n.as_f64().ok_or_else(|| anyhow!("{} is not representable", n)))
        .collect::<Result<Vec<_>>>()
        .map(Operands::Floats)
}

fn float(value: f64) -> Result<Value> {
    Number::from_f64(value)
        .map(Value::Number)
        .ok_or_else(|| anyhow!("result is not a finite number"))
}

fn fold(
    args: &Args,
    init_int: i64,
    int_op: fn(i64, i64) -> Option<i64>,
    float_op: fn(f64, f64) -> f64,
) -> Result<Value> {
    match operands(args)? {
        Operands::Ints(ints) => ints
            .into_iter()
            .try_fold(init_int, int_op)
            .map(Value::from)
            .ok_or_else(|| anyhow!("integer overflow")),
        Operands::Floats(floats) => float(floats.into_iter().fold(init_int as f64, float_op)),
    }
}

fn add(args: &Args) -> Result<Value> {
    fold(args, 0, i64::checked_add, |a, b| a + b)
}

fn mul(args: &Args) -> Result<Value> {
    fold(args, 1, i64::checked_mul, |a, b| a * b)
}

fn sub(args: &Args) -> Result<Value> {
    match operands(args)? {
        Operands::Ints(ints) => {
            let (first, rest) = ints
                .split_first()
                .ok_or_else(|| anyhow!("nothing to subtract from"))?;
            rest.iter()
                .try_fold(*first, |acc, n| acc.checked_sub(*n))
                .map(Value::from)
                .ok_or_else(|| anyhow!("integer overflow"))
        }
        Operands::Floats(floats) => {
            let (first, rest) = floats
                .split_first()
                .ok_or_else(|| anyhow!("nothing to subtract from"))?;
            float(rest.iter().fold(*first, |acc, n| acc - n))
        }
    }
}

fn div(args: &Args) -> Result<Value> {
    match operands(args)? {
        Operands::Ints(ints) => {
            let &[a, b] = ints.as_slice() else {
                bail!("expected two operands");
            };
            if b == 0 {
                bail!("division by zero");
            }
            match a.checked_rem(b) {
                Some(0) => a
                    .checked_div(b)
                    .map(Value::from)
                    .ok_or_else(|| anyhow!("integer overflow")),
                _ => float(a as f64 / b as f64),
            }
        }
        Operands::Floats(floats) => {
            let &[a, b] = floats.as_slice() else {
                bail!("expected two operands");
            };
            if b == 0.0 {
                bail!("division by zero");
            }
            float(a / b)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use switchyard_dispatch::{dispatch, FailureKind};

    fn run(name: &str, args: Vec<Value>) -> switchyard_dispatch::InvocationResult {
        dispatch(&registry().unwrap(), name, args)
    }

    #[test]
    fn test_registry_lists_every_builtin() {
        let names = registry().unwrap().list_names();
        assert_eq!(
            names,
            vec![
                "core.echo",
                "core.fail",
                "math.add",
                "math.div",
                "math.mul",
                "math.sub",
                "text.concat",
                "text.len",
                "text.lower",
                "text.upper",
            ]
        );
    }

    #[test]
    fn test_every_builtin_has_a_description() {
        let registry = registry().unwrap();
        for name in registry.list_names() {
            let info = registry.describe(&name).unwrap();
            assert!(info.description.is_some(), "{} has no description", name);
        }
    }

    #[test]
    fn test_add() {
        assert_eq!(run("math.add", vec![json!(2), json!(3)]).value(), Some(&json!(5)));
        assert_eq!(run("math.add", vec![]).value(), Some(&json!(0)));
        assert_eq!(
            run("math.add", vec![json!(1), json!(0.5)]).value(),
            Some(&json!(1.5))
        );
    }

    #[test]
    fn test_add_overflow_is_handler_error() {
        let result = run("math.add", vec![json!(i64::MAX), json!(1)]);
        assert_eq!(result.kind(), Some(FailureKind::HandlerError));
        assert_eq!(result.message(), Some("integer overflow"));
    }

    #[test]
    fn test_add_rejects_non_numbers() {
        let result = run("math.add", vec![json!(1), json!("two")]);
        assert_eq!(result.kind(), Some(FailureKind::InvalidArguments));
    }

    #[test]
    fn test_sub_and_mul() {
        assert_eq!(
            run("math.sub", vec![json!(10), json!(3), json!(2)]).value(),
            Some(&json!(5))
        );
        assert_eq!(run("math.sub", vec![json!(4)]).value(), Some(&json!(4)));
        assert_eq!(
            run("math.sub", vec![]).kind(),
            Some(FailureKind::InvalidArguments)
        );
        assert_eq!(
            run("math.mul", vec![json!(2), json!(3), json!(4)]).value(),
            Some(&json!(24))
        );
        assert_eq!(run("math.mul", vec![]).value(), Some(&json!(1)));
    }

    #[test]
    fn test_div() {
        assert_eq!(run("math.div", vec![json!(6), json!(3)]).value(), Some(&json!(2)));
        assert_eq!(run("math.div", vec![json!(7), json!(2)]).value(), Some(&json!(3.5)));

        let by_zero = run("math.div", vec![json!(1), json!(0)]);
        assert_eq!(by_zero.kind(), Some(FailureKind::HandlerError));
        assert_eq!(by_zero.message(), Some("division by zero"));

        assert_eq!(
            run("math.div", vec![json!(1)]).kind(),
            Some(FailureKind::InvalidArguments)
        );
    }

    #[test]
    fn test_text_handlers() {
        assert_eq!(run("text.upper", vec![json!("hi")]).value(), Some(&json!("HI")));
        assert_eq!(run("text.lower", vec![json!("HI")]).value(), Some(&json!("hi")));
        assert_eq!(
            run("text.concat", vec![json!("a"), json!("b"), json!("c")]).value(),
            Some(&json!("abc"))
        );
        assert_eq!(run("text.len", vec![json!("héllo")]).value(), Some(&json!(5)));
        assert_eq!(
            run("text.upper", vec![json!(3)]).kind(),
            Some(FailureKind::InvalidArguments)
        );
    }

    #[test]
    fn test_core_echo_and_fail() {
        assert_eq!(
            run("core.echo", vec![json!(1), json!("x")]).value(),
            Some(&json!([1, "x"]))
        );

        let failed = run("core.fail", vec![]);
        assert_eq!(failed.kind(), Some(FailureKind::HandlerError));
        assert_eq!(failed.message(), Some("requested failure"));

        let custom = run("core.fail", vec![json!("custom")]);
        assert_eq!(custom.message(), Some("custom"));
    }
}
