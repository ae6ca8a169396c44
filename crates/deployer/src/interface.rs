//! Constructor schema inspection and argument coercion.

use {
    alloy::{
        dyn_abi::{DynSolType, DynSolValue, Specifier},
        json_abi::JsonAbi,
        primitives::Bytes,
    },
    serde_json::Value,
    std::sync::Arc,
    thiserror::Error,
};

#[derive(Debug, Error)]
pub enum ArgumentError {
    #[error("constructor takes {expected} arguments but {actual} were given")]
    Arity { expected: usize, actual: usize },
    #[error("argument {index} is not a valid {ty}: {reason}")]
    Type {
        index: usize,
        ty: String,
        reason: String,
    },
    #[error("constructor declares an unsupported type: {0}")]
    Schema(#[from] alloy::dyn_abi::Error),
}

/// The ABI of a contract.
#[derive(Clone, Debug)]
pub struct ContractInterface(Arc<JsonAbi>);

impl ContractInterface {
    pub fn new(abi: JsonAbi) -> Self {
        Self(Arc::new(abi))
    }

    pub fn abi(&self) -> &JsonAbi {
        &self.0
    }

    /// Whether the ABI declares a constructor whose inputs can be used as an
    /// encoding schema.
    pub fn has_constructor(&self) -> bool {
        self.0.constructor().is_some()
    }

    /// Input types of the constructor. A contract without an explicit
    /// constructor takes no arguments.
    pub fn constructor_types(&self) -> Result<Vec<DynSolType>, ArgumentError> {
        let Some(constructor) = self.0.constructor() else {
            return Ok(Vec::new());
        };
        constructor
            .inputs
            .iter()
            .map(|param| param.resolve().map_err(ArgumentError::from))
            .collect()
    }

    /// Converts loosely typed arguments into ABI values of the constructor's
    /// input types.
    pub fn coerce_constructor_args(
        &self,
        args: &[Value],
    ) -> Result<Vec<DynSolValue>, ArgumentError> {
        let types = self.constructor_types()?;
        if types.len() != args.len() {
            return Err(ArgumentError::Arity {
                expected: types.len(),
                actual: args.len(),
            });
        }
        types
            .iter()
            .zip(args)
            .enumerate()
            .map(|(index, (ty, value))| {
                coerce(ty, value).map_err(|reason| ArgumentError::Type {
                    index,
                    ty: ty.to_string(),
                    reason,
                })
            })
            .collect()
    }

    /// ABI encodes the arguments as constructor parameters (no selector).
    pub fn encode_constructor_args(&self, args: &[Value]) -> Result<Bytes, ArgumentError> {
        let values = self.coerce_constructor_args(args)?;
        Ok(DynSolValue::Tuple(values).abi_encode_params().into())
    }

    /// Like [`Self::encode_constructor_args`] but yields `None` instead of an
    /// error when there is no constructor schema or the arguments don't fit
    /// it.
    pub fn try_encode_constructor_args(&self, args: &[Value]) -> Option<Bytes> {
        if !self.has_constructor() {
            return None;
        }
        self.encode_constructor_args(args)
            .inspect_err(|err| tracing::debug!(?err, "could not encode constructor arguments"))
            .ok()
    }
}

fn coerce(ty: &DynSolType, value: &Value) -> Result<DynSolValue, String> {
    match (ty, value) {
        (DynSolType::Array(inner), Value::Array(items)) => items
            .iter()
            .map(|item| coerce(inner, item))
            .collect::<Result<_, _>>()
            .map(DynSolValue::Array),
        (DynSolType::FixedArray(inner, len), Value::Array(items)) => {
            if items.len() != *len {
                return Err(format!("expected {len} elements, got {}", items.len()));
            }
            items
                .iter()
                .map(|item| coerce(inner, item))
                .collect::<Result<_, _>>()
                .map(DynSolValue::FixedArray)
        }
        (DynSolType::Tuple(types), Value::Array(items)) => {
            if items.len() != types.len() {
                return Err(format!(
                    "expected {} tuple fields, got {}",
                    types.len(),
                    items.len()
                ));
            }
            types
                .iter()
                .zip(items)
                .map(|(ty, item)| coerce(ty, item))
                .collect::<Result<_, _>>()
                .map(DynSolValue::Tuple)
        }
        (_, Value::String(text)) => ty.coerce_str(text).map_err(|err| err.to_string()),
        (_, Value::Number(number)) => ty
            .coerce_str(&number.to_string())
            .map_err(|err| err.to_string()),
        (_, Value::Bool(flag)) => ty
            .coerce_str(&flag.to_string())
            .map_err(|err| err.to_string()),
        (_, other) => Err(format!("unsupported value {other}")),
    }
}
