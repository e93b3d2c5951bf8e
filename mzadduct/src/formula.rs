//! Elemental formulae and the arithmetic used to derive adducts from them.
use std::collections::btree_map::{self, BTreeMap};
use std::fmt::{self, Display};
use std::ops::{Add, AddAssign};
use std::str::FromStr;

use chemical_elements::{ChemicalComposition, ElementSpecification, FormulaParserError};
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FormulaError {
    #[error("{0:?} is not an element")]
    UnknownElement(String),
    #[error("Failed to parse formula {formula:?}: {reason}")]
    Malformed { formula: String, reason: String },
    #[error("Subtracting {removed} {element} from {available} would leave a negative count")]
    NegativeCount {
        element: String,
        available: u32,
        removed: u32,
    },
    #[error("The count of {0} exceeds the largest supported count")]
    CountOverflow(String),
}

/// The largest count of a single element, bounded by [`ChemicalComposition`]'s `i32` counts
pub const MAX_COUNT: u32 = i32::MAX as u32;

fn check_element(symbol: &str) -> Result<(), FormulaError> {
    match symbol.parse::<ElementSpecification>() {
        Ok(spec) if spec.isotope == 0 => Ok(()),
        _ => Err(FormulaError::UnknownElement(symbol.to_string())),
    }
}

fn checked_count(symbol: &str, current: u32, added: u32) -> Result<u32, FormulaError> {
    current
        .checked_add(added)
        .filter(|total| *total <= MAX_COUNT)
        .ok_or_else(|| FormulaError::CountOverflow(symbol.to_string()))
}

/// An elemental composition with non-negative integer counts.
///
/// Elements with a count of zero are never stored, so two formulae compare equal
/// whenever they describe the same atoms.
#[derive(Debug, Default, Clone, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(
    feature = "serde",
    serde(try_from = "BTreeMap<String, u32>", into = "BTreeMap<String, u32>")
)]
pub struct Formula(BTreeMap<String, u32>);

impl Formula {
    pub fn new() -> Self {
        Self::default()
    }

    /// A formula holding a single atom of `symbol`
    pub fn from_element(symbol: &str) -> Result<Self, FormulaError> {
        Self::from_counts([(symbol, 1)])
    }

    /// A single atom of an element known to be in the periodic table
    pub(crate) fn single_atom(symbol: &'static str) -> Self {
        Self(BTreeMap::from([(symbol.to_string(), 1)]))
    }

    /// Build a formula from `(symbol, count)` pairs. Repeated symbols accumulate.
    pub fn from_counts<'a, I: IntoIterator<Item = (&'a str, u32)>>(
        counts: I,
    ) -> Result<Self, FormulaError> {
        let mut this = Self::new();
        for (symbol, count) in counts {
            let symbol = symbol.trim();
            check_element(symbol)?;
            if count > 0 {
                let entry = this.0.entry(symbol.to_string()).or_default();
                *entry = checked_count(symbol, *entry, count)?;
            }
        }
        Ok(this)
    }

    pub fn count(&self, symbol: &str) -> u32 {
        self.0.get(symbol).copied().unwrap_or_default()
    }

    pub fn iter(&self) -> btree_map::Iter<'_, String, u32> {
        self.0.iter()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Add `other` element-wise.
    ///
    /// # Errors
    /// [`FormulaError::CountOverflow`] if any count would exceed [`MAX_COUNT`]
    pub fn checked_add(&self, other: &Formula) -> Result<Formula, FormulaError> {
        let mut result = self.clone();
        for (element, added) in other.iter() {
            let entry = result.0.entry(element.clone()).or_default();
            *entry = checked_count(element, *entry, *added)?;
        }
        Ok(result)
    }

    /// Subtract `other` element-wise.
    ///
    /// # Errors
    /// [`FormulaError::NegativeCount`] if `other` holds more of any element than `self`
    pub fn checked_sub(&self, other: &Formula) -> Result<Formula, FormulaError> {
        let mut result = self.clone();
        for (element, removed) in other.iter() {
            let available = self.count(element);
            if *removed > available {
                return Err(FormulaError::NegativeCount {
                    element: element.clone(),
                    available,
                    removed: *removed,
                });
            }
            if available == *removed {
                result.0.remove(element);
            } else {
                result.0.insert(element.clone(), available - removed);
            }
        }
        Ok(result)
    }

    /// Convert into a [`ChemicalComposition`] for mass and isotopic pattern calculations
    pub fn to_composition<'a>(&self) -> Result<ChemicalComposition<'a>, FormulaError> {
        let mut composition = ChemicalComposition::new();
        for (symbol, count) in self.iter() {
            let element: ElementSpecification<'a> = symbol
                .parse()
                .map_err(|_| FormulaError::UnknownElement(symbol.clone()))?;
            let count =
                i32::try_from(*count).map_err(|_| FormulaError::CountOverflow(symbol.clone()))?;
            composition.set(element, count);
        }
        Ok(composition)
    }

    /// Convert from a [`ChemicalComposition`], rejecting isotope-labelled elements and
    /// negative counts
    pub fn from_composition(composition: &ChemicalComposition<'_>) -> Result<Self, FormulaError> {
        let mut this = Self::new();
        for (spec, count) in composition.iter() {
            let symbol = spec.element.symbol.as_str();
            if spec.isotope != 0 {
                return Err(FormulaError::Malformed {
                    formula: composition.to_string(),
                    reason: format!("isotope {spec} is not supported"),
                });
            }
            let count = u32::try_from(*count).map_err(|_| FormulaError::Malformed {
                formula: composition.to_string(),
                reason: format!("negative count {count} of {symbol}"),
            })?;
            if count > 0 {
                let entry = this.0.entry(symbol.to_string()).or_default();
                *entry = checked_count(symbol, *entry, count)?;
            }
        }
        Ok(this)
    }

    /// The monoisotopic mass of the neutral formula
    pub fn monoisotopic_mass(&self) -> Result<f64, FormulaError> {
        Ok(self.to_composition()?.mass())
    }
}

/// Element-wise addition. Counts saturate at [`MAX_COUNT`], use [`Formula::checked_add`]
/// to detect overflow.
impl Add<&Formula> for &Formula {
    type Output = Formula;

    fn add(self, rhs: &Formula) -> Self::Output {
        let mut dup = self.clone();
        dup += rhs;
        dup
    }
}

impl Add for Formula {
    type Output = Formula;

    fn add(mut self, rhs: Self) -> Self::Output {
        self += &rhs;
        self
    }
}

impl AddAssign<&Formula> for Formula {
    fn add_assign(&mut self, rhs: &Formula) {
        for (element, count) in rhs.iter() {
            let entry = self.0.entry(element.clone()).or_default();
            *entry = entry.saturating_add(*count).min(MAX_COUNT);
        }
    }
}

impl<'a> IntoIterator for &'a Formula {
    type Item = (&'a String, &'a u32);
    type IntoIter = btree_map::Iter<'a, String, u32>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

impl TryFrom<BTreeMap<String, u32>> for Formula {
    type Error = FormulaError;

    fn try_from(value: BTreeMap<String, u32>) -> Result<Self, Self::Error> {
        Self::from_counts(value.iter().map(|(k, v)| (k.as_str(), *v)))
    }
}

impl From<Formula> for BTreeMap<String, u32> {
    fn from(value: Formula) -> Self {
        value.0
    }
}

impl Display for Formula {
    /// Hill order, as written by `chemical_elements`
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let composition = self.to_composition().map_err(|_| fmt::Error)?;
        write!(f, "{composition}")
    }
}

/// The element symbols of a condensed formula. [`ChemicalComposition`]'s parser indexes
/// the periodic table directly, so every symbol must be known before it runs.
fn element_symbols(s: &str) -> impl Iterator<Item = &str> {
    s.char_indices()
        .filter(|(_, c)| c.is_ascii_uppercase())
        .map(move |(i, _)| {
            let len = s[i + 1..]
                .find(|c: char| !c.is_ascii_lowercase())
                .unwrap_or(s.len() - i - 1);
            &s[i..i + 1 + len]
        })
}

impl FromStr for Formula {
    type Err = FormulaError;

    /// Parse a condensed formula such as `C12H11N`, `Na` or `(CH3)2O`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        for symbol in element_symbols(s) {
            check_element(symbol)?;
        }
        let composition: ChemicalComposition =
            s.parse().map_err(|e: FormulaParserError| FormulaError::Malformed {
                formula: s.to_string(),
                reason: e.to_string(),
            })?;
        Self::from_composition(&composition)
    }
}

#[cfg(test)]
mod test {
    use super::*;

    fn diphenylamine() -> Formula {
        Formula::from_counts([
            ("C", 6),
            ("H", 5),
            ("N", 1),
            ("H", 1),
            ("C", 6),
            ("H", 5),
        ])
        .unwrap()
    }

    #[test]
    fn test_accumulate_counts() {
        let f = diphenylamine();
        assert_eq!(f.count("C"), 12);
        assert_eq!(f.count("H"), 11);
        assert_eq!(f.count("N"), 1);
        assert_eq!(f.count("O"), 0);
        assert_eq!(f.len(), 3);
        assert_eq!(f.to_string(), "C12H11N1");
        assert_eq!(f.to_string().parse::<Formula>().unwrap(), f);
    }

    #[test]
    fn test_parse() -> Result<(), FormulaError> {
        let f: Formula = "C12H11N".parse()?;
        assert_eq!(f, diphenylamine());
        let na: Formula = "Na".parse()?;
        assert_eq!(na, Formula::from_element("Na")?);
        assert!(matches!(
            "12C".parse::<Formula>(),
            Err(FormulaError::Malformed { .. })
        ));
        assert!(matches!(
            "Xx2".parse::<Formula>(),
            Err(FormulaError::UnknownElement(_))
        ));
        assert!(matches!(
            "C12Xx".parse::<Formula>(),
            Err(FormulaError::UnknownElement(_))
        ));
        assert!(matches!(
            "C[13]H4".parse::<Formula>(),
            Err(FormulaError::Malformed { .. })
        ));
        let ether: Formula = "(CH3)2O".parse()?;
        assert_eq!(ether, Formula::from_counts([("C", 2), ("H", 6), ("O", 1)])?);
        Ok(())
    }

    #[test]
    fn test_count_overflow() -> Result<(), FormulaError> {
        let big = Formula::from_counts([("C", MAX_COUNT)])?;
        let carbon = Formula::from_element("C")?;
        assert!(matches!(
            big.checked_add(&carbon),
            Err(FormulaError::CountOverflow(_))
        ));
        assert!(matches!(
            Formula::from_counts([("C", MAX_COUNT), ("C", 1)]),
            Err(FormulaError::CountOverflow(_))
        ));
        assert_eq!((&big + &carbon).count("C"), MAX_COUNT);
        assert_eq!(big.to_composition()?.len(), 1);
        Ok(())
    }

    #[cfg(feature = "serde")]
    #[test]
    fn test_deserialize_validates() {
        let f: Formula = serde_json::from_str(r#"{"C": 6, "H": 6}"#).unwrap();
        assert_eq!(f.count("H"), 6);
        assert_eq!(serde_json::to_string(&f).unwrap(), r#"{"C":6,"H":6}"#);
        assert!(serde_json::from_str::<Formula>(r#"{"Xx": 1}"#).is_err());
        assert!(serde_json::from_str::<Formula>(r#"{"C": 4294967295}"#).is_err());
    }

    #[test]
    fn test_add_sub_roundtrip() -> Result<(), FormulaError> {
        let base = diphenylamine();
        let delta = Formula::from_element("Na")?;
        let added = &base + &delta;
        assert_eq!(added.count("Na"), 1);
        assert_eq!(added.count("C"), 12);
        let restored = added.checked_sub(&delta)?;
        assert_eq!(restored, base);
        Ok(())
    }

    #[test]
    fn test_negative_subtraction_rejected() {
        let base = diphenylamine();
        let delta = Formula::from_counts([("H", 12)]).unwrap();
        match base.checked_sub(&delta) {
            Err(FormulaError::NegativeCount {
                element,
                available,
                removed,
            }) => {
                assert_eq!(element, "H");
                assert_eq!(available, 11);
                assert_eq!(removed, 12);
            }
            other => panic!("Expected a negative count error, got {other:?}"),
        }
        let missing = Formula::from_element("Na").unwrap();
        assert!(base.checked_sub(&missing).is_err());
    }

    #[test]
    fn test_zero_counts_dropped() {
        let f = Formula::from_counts([("C", 0), ("H", 2)]).unwrap();
        assert_eq!(f.len(), 1);
        let h = Formula::from_counts([("H", 2)]).unwrap();
        assert!(h.checked_sub(&f).unwrap().is_empty());
    }

    #[test]
    fn test_mass() {
        let water: Formula = "H2O".parse().unwrap();
        let mass = water.monoisotopic_mass().unwrap();
        assert!((mass - 18.0105646).abs() < 1e-3, "{mass}");
    }
}
