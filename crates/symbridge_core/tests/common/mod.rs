//! Helpers shared by the integration tests.

#![allow(dead_code)]

use symbridge_core::{BindingResult, Engine};
use symbridge_testkit::{ExpressionVector, Operation};

/// Runs one vector against `engine` and returns the result text.
pub fn run_vector(engine: &Engine, vector: &ExpressionVector) -> BindingResult<String> {
    let input = engine.parse(&vector.input)?;
    let var = engine.parse(vector.var.as_deref().unwrap_or("x"))?;

    let output = match vector.operation {
        Operation::Stringify => return Ok(input.stringify()?.to_owned()),
        Operation::Simplify => input.simplify()?,
        Operation::Differentiate => input.differentiate(&var)?,
        Operation::Integrate => input.integrate(&var)?,
        Operation::SolveEquation => input.solve_equation(&var)?,
    };
    Ok(output.stringify()?.to_owned())
}

/// Installs a test subscriber honouring `RUST_LOG`.
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}
