use std::fmt::Display;
use std::str::FromStr;

use clap::ValueEnum;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use mzadduct::{Adduct, AdductError, AdductOperation, Formula, FormulaError};

/// Adducts available by name
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum BuiltinAdduct {
    /// [M + H]⁺
    PlusH,
    /// [M + Na]⁺
    PlusSodium,
}

impl From<BuiltinAdduct> for Adduct {
    fn from(value: BuiltinAdduct) -> Self {
        match value {
            BuiltinAdduct::PlusH => Adduct::plus_h(),
            BuiltinAdduct::PlusSodium => Adduct::plus_sodium(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Error)]
pub enum ArgAdductParseError {
    #[error("Expected a built-in adduct name or NAME:DELTA:OP, got {0:?}")]
    Malformed(String),
    #[error("Invalid adduct formula: {0}")]
    Formula(#[from] FormulaError),
    #[error("Invalid adduct: {0}")]
    Adduct(#[from] AdductError),
}

/// An adduct given on the command line or in a configuration file, either a
/// [`BuiltinAdduct`] name or a `NAME:DELTA:OP` triple such as `[%s + K]⁺:K:add`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum ArgAdduct {
    Builtin(BuiltinAdduct),
    Custom(Adduct),
}

impl ArgAdduct {
    pub fn to_adduct(&self) -> Adduct {
        match self {
            ArgAdduct::Builtin(b) => (*b).into(),
            ArgAdduct::Custom(a) => a.clone(),
        }
    }
}

impl FromStr for ArgAdduct {
    type Err = ArgAdductParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if let Ok(builtin) = <BuiltinAdduct as ValueEnum>::from_str(s.trim(), true) {
            return Ok(Self::Builtin(builtin));
        }
        let mut tokens = s.rsplitn(3, ':');
        let (Some(operation), Some(delta), Some(name)) = (tokens.next(), tokens.next(), tokens.next())
        else {
            return Err(ArgAdductParseError::Malformed(s.to_string()));
        };
        let delta: Formula = delta.parse()?;
        let operation: AdductOperation = operation.parse()?;
        Ok(Self::Custom(Adduct::new(name, delta, operation)?))
    }
}

impl Display for ArgAdduct {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ArgAdduct::Builtin(b) => match b.to_possible_value() {
                Some(v) => f.write_str(v.get_name()),
                None => write!(f, "{b:?}"),
            },
            ArgAdduct::Custom(a) => write!(f, "{}:{}:{}", a.name(), a.delta(), a.operation()),
        }
    }
}

impl TryFrom<String> for ArgAdduct {
    type Error = ArgAdductParseError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<ArgAdduct> for String {
    fn from(value: ArgAdduct) -> Self {
        value.to_string()
    }
}

pub fn default_adducts() -> Vec<ArgAdduct> {
    vec![
        ArgAdduct::Builtin(BuiltinAdduct::PlusH),
        ArgAdduct::Builtin(BuiltinAdduct::PlusSodium),
    ]
}

pub fn non_negative_float(s: &str) -> Result<f64, String> {
    let value = s.parse::<f64>().map_err(|e| e.to_string())?;
    if value < 0.0 {
        Err(format!("`{s}` is less than zero"))
    } else {
        Ok(value)
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_parse_builtin() {
        let a: ArgAdduct = "plus-sodium".parse().unwrap();
        assert_eq!(a, ArgAdduct::Builtin(BuiltinAdduct::PlusSodium));
        assert_eq!(a.to_adduct(), Adduct::plus_sodium());
        assert_eq!(a.to_string(), "plus-sodium");
    }

    #[test]
    fn test_parse_custom() {
        let a: ArgAdduct = "[%s + K]⁺:K:add".parse().unwrap();
        let adduct = a.to_adduct();
        assert_eq!(adduct.label("M"), "[M + K]⁺");
        assert_eq!(adduct.delta().count("K"), 1);
        assert_eq!(a.to_string(), "[%s + K]⁺:K1:add");
        assert_eq!(a.to_string().parse::<ArgAdduct>().unwrap(), a);

        let loss: ArgAdduct = "[%s - H]⁻:H:sub".parse().unwrap();
        assert_eq!(loss.to_adduct().operation(), AdductOperation::Sub);
    }

    #[test]
    fn test_parse_errors() {
        assert!(matches!(
            "plus-k".parse::<ArgAdduct>(),
            Err(ArgAdductParseError::Malformed(_))
        ));
        assert!(matches!(
            "[%s + Q]:Q:add".parse::<ArgAdduct>(),
            Err(ArgAdductParseError::Formula(FormulaError::UnknownElement(_)))
        ));
        assert!(matches!(
            "[%s + K]:K:mul".parse::<ArgAdduct>(),
            Err(ArgAdductParseError::Adduct(AdductError::InvalidOperation(_)))
        ));
        assert!(matches!(
            "[M + K]:K:add".parse::<ArgAdduct>(),
            Err(ArgAdductParseError::Adduct(AdductError::InvalidTemplate(_)))
        ));
    }
}
