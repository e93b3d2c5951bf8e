//! Adducts of an analyte and the mass spectra they are expected to produce
use std::fmt::{self, Display};
use std::slice;
use std::str::FromStr;

use itertools::Itertools;
use thiserror::Error;
use tracing::debug;

use crate::formula::{Formula, FormulaError};
use crate::isotopic_model::IsotopicDistributionGenerator;
use crate::spectrum::{iso_dist_to_mass_spec, MassSpectrum};

/// The placeholder for the analyte in an adduct name template
pub const TEMPLATE_SLOT: &str = "%s";

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AdductError {
    #[error("The adduct formula could not be resolved: {0}")]
    TypeConversion(#[source] FormulaError),
    #[error("Unsupported operation {0:?}, expected \"add\" or \"sub\"")]
    InvalidOperation(String),
    #[error("Adduct name {0:?} must contain exactly one {TEMPLATE_SLOT:?} placeholder")]
    InvalidTemplate(String),
    #[error("Failed to apply adduct: {0}")]
    Formula(
        #[source]
        #[from]
        FormulaError,
    ),
}

/// Whether an adduct adds or removes its formula from the analyte
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "lowercase"))]
pub enum AdductOperation {
    #[default]
    Add,
    Sub,
}

impl FromStr for AdductOperation {
    type Err = AdductError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "add" => Ok(Self::Add),
            "sub" => Ok(Self::Sub),
            other => Err(AdductError::InvalidOperation(other.to_string())),
        }
    }
}

impl Display for AdductOperation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AdductOperation::Add => f.write_str("add"),
            AdductOperation::Sub => f.write_str("sub"),
        }
    }
}

/// A named transformation from an analyte formula to the formula of one of its adducts.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(try_from = "AdductFields", into = "AdductFields"))]
pub struct Adduct {
    name: String,
    delta: Formula,
    operation: AdductOperation,
}

impl Adduct {
    /// Create a new adduct.
    ///
    /// # Arguments
    /// - `name`: A template such as `"[%s + H]⁺"`, holding exactly one `%s` for the analyte
    /// - `delta`: The elements added to or removed from the analyte
    /// - `operation`: Whether `delta` is added or removed
    pub fn new(
        name: impl Into<String>,
        delta: Formula,
        operation: AdductOperation,
    ) -> Result<Self, AdductError> {
        let name = name.into();
        if name.matches(TEMPLATE_SLOT).count() != 1 {
            return Err(AdductError::InvalidTemplate(name));
        }
        Ok(Self {
            name,
            delta,
            operation,
        })
    }

    /// Create an adduct which adds or removes a single atom of `symbol`
    pub fn from_element(
        name: impl Into<String>,
        symbol: &str,
        operation: AdductOperation,
    ) -> Result<Self, AdductError> {
        let delta = Formula::from_element(symbol).map_err(AdductError::TypeConversion)?;
        Self::new(name, delta, operation)
    }

    /// `[M + H]⁺`
    pub fn plus_h() -> Self {
        Self {
            name: "[%s + H]⁺".to_string(),
            delta: Formula::single_atom("H"),
            operation: AdductOperation::Add,
        }
    }

    /// `[M + Na]⁺`
    pub fn plus_sodium() -> Self {
        Self {
            name: "[%s + Na]⁺".to_string(),
            delta: Formula::single_atom("Na"),
            operation: AdductOperation::Add,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn delta(&self) -> &Formula {
        &self.delta
    }

    pub fn operation(&self) -> AdductOperation {
        self.operation
    }

    /// Render the name template with `base` in place of the analyte
    pub fn label(&self, base: &str) -> String {
        self.name.replacen(TEMPLATE_SLOT, base, 1)
    }

    /// Create the formula of this adduct of `formula`
    pub fn apply(&self, formula: &Formula) -> Result<Formula, AdductError> {
        match self.operation {
            AdductOperation::Add => Ok(formula.checked_add(&self.delta)?),
            AdductOperation::Sub => Ok(formula.checked_sub(&self.delta)?),
        }
    }
}

/// The unvalidated fields of an [`Adduct`], as read from or written to a serialized form
#[cfg(feature = "serde")]
#[derive(serde::Serialize, serde::Deserialize)]
struct AdductFields {
    name: String,
    delta: Formula,
    operation: AdductOperation,
}

#[cfg(feature = "serde")]
impl TryFrom<AdductFields> for Adduct {
    type Error = AdductError;

    fn try_from(value: AdductFields) -> Result<Self, Self::Error> {
        Adduct::new(value.name, value.delta, value.operation)
    }
}

#[cfg(feature = "serde")]
impl From<Adduct> for AdductFields {
    fn from(value: Adduct) -> Self {
        Self {
            name: value.name,
            delta: value.delta,
            operation: value.operation,
        }
    }
}

impl Display for Adduct {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.label("M"))
    }
}

/// The predicted mass spectrum of each adduct of an analyte, keyed by the adduct's
/// label and kept in insertion order.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct AdductSpectra {
    entries: Vec<(String, MassSpectrum)>,
}

impl AdductSpectra {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a spectrum under `label`, replacing and returning any spectrum already stored there
    pub fn insert(&mut self, label: String, spectrum: MassSpectrum) -> Option<MassSpectrum> {
        match self.entries.iter_mut().find(|(l, _)| *l == label) {
            Some((_, existing)) => Some(std::mem::replace(existing, spectrum)),
            None => {
                self.entries.push((label, spectrum));
                None
            }
        }
    }

    pub fn get(&self, label: &str) -> Option<&MassSpectrum> {
        self.entries
            .iter()
            .find(|(l, _)| l == label)
            .map(|(_, s)| s)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> slice::Iter<'_, (String, MassSpectrum)> {
        self.entries.iter()
    }

    pub fn labels(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|(l, _)| l.as_str())
    }

    /// The sorted, duplicate-free union of the masses of every spectrum
    pub fn mass_list(&self) -> Vec<f64> {
        self.entries
            .iter()
            .flat_map(|(_, s)| s.iter().map(|p| p.mass))
            .sorted_by(|a, b| a.total_cmp(b))
            .dedup()
            .collect()
    }
}

/// Compute the mass spectrum of each of `adducts` of `formula`.
///
/// # Arguments
/// - `formula`: The analyte
/// - `adducts`: The adducts to derive. Adducts rendering the same label replace one another.
/// - `model`: The source of isotopic distributions
/// - `min_abundance`: Isotopologues with an abundance at or below this are omitted
pub fn get_adduct_spectra<'a, I, G>(
    formula: &Formula,
    adducts: I,
    model: &mut G,
    min_abundance: f64,
) -> Result<AdductSpectra, AdductError>
where
    I: IntoIterator<Item = &'a Adduct>,
    G: IsotopicDistributionGenerator + ?Sized,
{
    let mut spectra = AdductSpectra::new();
    for adduct in adducts {
        let adduct_formula = adduct.apply(formula)?;
        let distribution = model
            .isotopic_distribution(&adduct_formula)
            .map_err(AdductError::TypeConversion)?;
        let spectrum = iso_dist_to_mass_spec(&distribution, min_abundance);
        debug!(
            "{adduct}: {adduct_formula} with {} isotopologues",
            spectrum.len()
        );
        spectra.insert(adduct.label("M"), spectrum);
    }
    Ok(spectra)
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::isotopic_model::{ElementalIsotopicModel, Isotopologue};

    /// Every formula gets two isotopologues, one and two daltons above its carbon count
    struct CarbonCounter;

    impl IsotopicDistributionGenerator for CarbonCounter {
        fn isotopic_distribution(
            &mut self,
            formula: &Formula,
        ) -> Result<Vec<Isotopologue>, FormulaError> {
            let base = formula.count("C") as f64 + formula.count("Na") as f64 * 10.0;
            Ok(vec![
                Isotopologue::new(base + 2.0, 0.25),
                Isotopologue::new(base + 1.0, 0.75),
            ])
        }
    }

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
    fn test_operation_parse() {
        assert_eq!(" ADD ".parse::<AdductOperation>().unwrap(), AdductOperation::Add);
        assert_eq!("sub".parse::<AdductOperation>().unwrap(), AdductOperation::Sub);
        assert!(matches!(
            "mul".parse::<AdductOperation>(),
            Err(AdductError::InvalidOperation(_))
        ));
    }

    #[test]
    fn test_construction_errors() {
        assert!(matches!(
            Adduct::from_element("[%s + Xx]⁺", "Xx", AdductOperation::Add),
            Err(AdductError::TypeConversion(FormulaError::UnknownElement(_)))
        ));
        assert!(matches!(
            Adduct::from_element("[M + H]⁺", "H", AdductOperation::Add),
            Err(AdductError::InvalidTemplate(_))
        ));
        assert!(matches!(
            Adduct::from_element("[%s + %s]⁺", "H", AdductOperation::Add),
            Err(AdductError::InvalidTemplate(_))
        ));
    }

    #[test]
    fn test_apply() -> Result<(), AdductError> {
        let base = diphenylamine();
        let plus_h = Adduct::plus_h();
        let protonated = plus_h.apply(&base)?;
        assert_eq!(protonated.count("H"), 12);
        assert_eq!(protonated, &base + plus_h.delta());

        let minus_h = Adduct::from_element("[%s - H]⁻", "H", AdductOperation::Sub)?;
        assert_eq!(minus_h.apply(&protonated)?, base);
        assert_eq!(minus_h.apply(&base)?.count("H"), 10);

        let minus_na = Adduct::from_element("[%s - Na]", "Na", AdductOperation::Sub)?;
        assert!(matches!(
            minus_na.apply(&base),
            Err(AdductError::Formula(FormulaError::NegativeCount { .. }))
        ));
        Ok(())
    }

    #[test]
    fn test_builtin_deltas() -> Result<(), FormulaError> {
        assert_eq!(Adduct::plus_h().delta(), &Formula::from_element("H")?);
        assert_eq!(Adduct::plus_sodium().delta(), &Formula::from_element("Na")?);
        Ok(())
    }

    #[cfg(feature = "serde")]
    #[test]
    fn test_deserialize_validates() {
        let adduct: Adduct = serde_json::from_str(
            r#"{"name": "[%s + K]⁺", "delta": {"K": 1}, "operation": "add"}"#,
        )
        .unwrap();
        assert_eq!(adduct.label("M"), "[M + K]⁺");
        let text = serde_json::to_string(&Adduct::plus_h()).unwrap();
        assert_eq!(serde_json::from_str::<Adduct>(&text).unwrap(), Adduct::plus_h());

        assert!(serde_json::from_str::<Adduct>(
            r#"{"name": "[M + K]⁺", "delta": {"K": 1}, "operation": "add"}"#
        )
        .is_err());
        assert!(serde_json::from_str::<Adduct>(
            r#"{"name": "[%s + Xx]⁺", "delta": {"Xx": 1}, "operation": "add"}"#
        )
        .is_err());
    }

    #[test]
    fn test_labels() {
        assert_eq!(Adduct::plus_h().label("M"), "[M + H]⁺");
        assert_eq!(Adduct::plus_sodium().to_string(), "[M + Na]⁺");
        assert_eq!(Adduct::plus_sodium().label("Diphenylamine"), "[Diphenylamine + Na]⁺");
    }

    #[test]
    fn test_empty_adducts() {
        let adducts: Vec<Adduct> = Vec::new();
        let spectra =
            get_adduct_spectra(&diphenylamine(), &adducts, &mut CarbonCounter, 0.0).unwrap();
        assert!(spectra.is_empty());
        assert!(spectra.mass_list().is_empty());
    }

    #[test]
    fn test_mass_list_order_independent() -> Result<(), AdductError> {
        let base = diphenylamine();
        let extra = Adduct::from_element("[%s + C]", "C", AdductOperation::Add)?;
        let forward = vec![Adduct::plus_h(), extra.clone(), Adduct::plus_sodium()];
        let backward = vec![Adduct::plus_sodium(), extra, Adduct::plus_h()];
        let a = get_adduct_spectra(&base, &forward, &mut CarbonCounter, 0.0)?;
        let b = get_adduct_spectra(&base, &backward, &mut CarbonCounter, 0.0)?;
        assert_eq!(a.len(), 3);
        let masses = a.mass_list();
        assert_eq!(masses, b.mass_list());
        // [M + H] and [M + C] overlap at 14.0
        assert_eq!(masses, vec![13.0, 14.0, 15.0, 23.0, 24.0]);
        assert!(masses.windows(2).all(|w| w[0] < w[1]));
        Ok(())
    }

    #[test]
    fn test_duplicate_label_replaces() {
        let mut spectra = AdductSpectra::new();
        assert!(spectra
            .insert("a".into(), MassSpectrum::new(&[1.0], &[100.0]))
            .is_none());
        assert!(spectra
            .insert("a".into(), MassSpectrum::new(&[2.0], &[100.0]))
            .is_some());
        assert_eq!(spectra.len(), 1);
        assert_eq!(spectra.mass_list(), vec![2.0]);
    }

    #[test]
    fn test_diphenylamine_adducts() -> Result<(), AdductError> {
        let mut model = ElementalIsotopicModel::new();
        let adducts = [Adduct::plus_h(), Adduct::plus_sodium()];
        let spectra = get_adduct_spectra(&diphenylamine(), &adducts, &mut model, 0.0)?;
        assert_eq!(spectra.len(), 2);
        assert_eq!(
            spectra.labels().collect::<Vec<_>>(),
            vec!["[M + H]⁺", "[M + Na]⁺"]
        );
        for (label, spectrum) in spectra.iter() {
            assert!(!spectrum.is_empty(), "{label} has no isotopologues");
            let masses = spectrum.mass_list();
            assert!(masses.windows(2).all(|w| w[0] <= w[1]), "{label} is unsorted");
            assert!(spectrum
                .iter()
                .all(|p| p.intensity > 0.0 && p.intensity <= 100.0));
        }

        let protonated = spectra.get("[M + H]⁺").unwrap();
        let expected = "C12H12N".parse::<Formula>()?.monoisotopic_mass()?;
        assert!((protonated.min_mass().unwrap() - expected).abs() < 1e-3);

        let mut union: Vec<f64> = spectra
            .iter()
            .flat_map(|(_, s)| s.mass_list())
            .collect();
        union.sort_by(|a, b| a.total_cmp(b));
        union.dedup();
        assert_eq!(spectra.mass_list(), union);
        Ok(())
    }
}
