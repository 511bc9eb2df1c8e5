//! # JSON-RPC Calculator
//!
//! Arithmetic handlers for the JSON-RPC dispatcher:
//!
//! - `add`, `subtract`, `multiply`, `divide` with params `{"a": number, "b": number}`
//! - `getInfo` without params
//! - `log`, a notification with params `{"message": string}`

use async_trait::async_trait;
use json_rpc_dispatch::{
    HandlerContext, HandlerError, HandlerRegistry, JsonRpcErrorObject, JsonRpcHandler,
    RegistryError, decode_params,
};
use serde::Deserialize;
use serde_json::{Number, Value, json};
use thiserror::Error;
use tracing::Level;

/// Name reported by `getInfo` and the health check
pub const SERVICE_NAME: &str = "JSON-RPC Calculator";
pub const SERVICE_VERSION: &str = "1.0";

/// Params shape of the arithmetic methods
pub const OPERAND_PARAMS: &str = r#"{"a": number, "b": number}"#;
/// Params shape of `log`
pub const LOG_PARAMS: &str = r#"{"message": string}"#;

/// Application error code for a division by zero
pub const DIVISION_BY_ZERO: i64 = -32000;

/// Parameters for binary operations. Both operands are required.
#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
pub struct CalculatorParams {
    pub a: f64,
    pub b: f64,
}

/// Parameters for the `log` notification
#[derive(Debug, Clone, Deserialize)]
pub struct LogParams {
    pub message: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operation {
    Add,
    Subtract,
    Multiply,
    Divide,
}

impl Operation {
    pub const ALL: [Operation; 4] = [
        Operation::Add,
        Operation::Subtract,
        Operation::Multiply,
        Operation::Divide,
    ];

    /// JSON-RPC method name
    pub fn method(self) -> &'static str {
        match self {
            Operation::Add => "add",
            Operation::Subtract => "subtract",
            Operation::Multiply => "multiply",
            Operation::Divide => "divide",
        }
    }

    pub fn symbol(self) -> char {
        match self {
            Operation::Add => '+',
            Operation::Subtract => '-',
            Operation::Multiply => '*',
            Operation::Divide => '/',
        }
    }

    pub fn apply(self, params: CalculatorParams) -> Result<f64, CalculatorError> {
        let CalculatorParams { a, b } = params;
        let result = match self {
            Operation::Add => a + b,
            Operation::Subtract => a - b,
            Operation::Multiply => a * b,
            Operation::Divide => {
                if b == 0.0 {
                    return Err(CalculatorError::DivisionByZero { dividend: a });
                }
                a / b
            }
        };

        if !result.is_finite() {
            return Err(CalculatorError::NonFinite {
                expression: format!("{} {} {}", a, self.symbol(), b),
            });
        }
        Ok(result)
    }
}

#[derive(Debug, Clone, PartialEq, Error)]
pub enum CalculatorError {
    #[error("Cannot divide {dividend} by zero")]
    DivisionByZero { dividend: f64 },

    #[error("Result of {expression} is not a finite number")]
    NonFinite { expression: String },
}

impl From<CalculatorError> for HandlerError {
    fn from(error: CalculatorError) -> Self {
        match error {
            CalculatorError::DivisionByZero { .. } => HandlerError::protocol(
                JsonRpcErrorObject::custom(
                    DIVISION_BY_ZERO,
                    "Division by zero",
                    Some(Value::String(error.to_string())),
                ),
            ),
            CalculatorError::NonFinite { .. } => HandlerError::internal(error),
        }
    }
}

/// Encode a finite result, using an integer when the value is integral
pub fn number_value(value: f64) -> Option<Value> {
    const MAX_EXACT: f64 = 9_007_199_254_740_992.0; // 2^53

    if value.is_finite() && value.fract() == 0.0 && value.abs() <= MAX_EXACT {
        return Some(Value::from(value as i64));
    }
    Number::from_f64(value).map(Value::Number)
}

/// One arithmetic method
#[derive(Debug, Clone, Copy)]
pub struct ArithmeticHandler {
    operation: Operation,
}

impl ArithmeticHandler {
    pub fn new(operation: Operation) -> Self {
        Self { operation }
    }
}

#[async_trait]
impl JsonRpcHandler for ArithmeticHandler {
    async fn handle(&self, params: Option<Value>, ctx: HandlerContext) -> Result<Value, HandlerError> {
        let params: CalculatorParams = decode_params(params, OPERAND_PARAMS)?;
        let result = self.operation.apply(params)?;

        ctx.log(
            Level::DEBUG,
            &format!(
                "Calculator: {} {} {} = {}",
                params.a,
                self.operation.symbol(),
                params.b,
                result
            ),
        );

        number_value(result).ok_or_else(|| {
            HandlerError::from(CalculatorError::NonFinite {
                expression: result.to_string(),
            })
        })
    }
}

async fn get_info(_params: Option<Value>, ctx: HandlerContext) -> Result<Value, HandlerError> {
    ctx.log(Level::DEBUG, "Calculator: getInfo called");
    let methods: Vec<&str> = Operation::ALL.iter().map(|op| op.method()).collect();

    Ok(json!({
        "name": SERVICE_NAME,
        "version": SERVICE_VERSION,
        "methods": methods,
        "description": "A simple calculator implementing JSON-RPC 2.0",
    }))
}

async fn log_message(params: LogParams, ctx: HandlerContext) -> Result<(), HandlerError> {
    ctx.log(Level::INFO, &format!("Calculator Log: {}", params.message));
    Ok(())
}

/// Registry with every calculator method
pub fn calculator_registry() -> Result<HandlerRegistry, RegistryError> {
    let mut registry = HandlerRegistry::new();
    for operation in Operation::ALL {
        registry.register(operation.method(), ArithmeticHandler::new(operation))?;
    }
    registry.register_fn("getInfo", get_info)?;
    registry.register_notification("log", LOG_PARAMS, log_message)?;
    Ok(registry)
}
