/*! Isotopic distributions for elemental formulae */
use std::collections::hash_map::{Entry, HashMap};

#[doc(hidden)]
pub use chemical_elements::isotopic_pattern::{
    BafflingRecursiveIsotopicPatternGenerator, TheoreticalIsotopicPattern,
};
use chemical_elements::{neutral_mass, PROTON as _PROTON};
use tracing::trace;

use crate::formula::{Formula, FormulaError};

/// The mass of H+, a hydrogen atom minus an electron
pub const PROTON: f64 = _PROTON;

/// A single isotopic variant of a formula
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Isotopologue {
    /// The neutral mass of the variant
    pub mass: f64,
    /// The fraction of all molecules of the formula expected to be this variant
    pub abundance: f64,
}

impl Isotopologue {
    pub fn new(mass: f64, abundance: f64) -> Self {
        Self { mass, abundance }
    }
}

/// The capability to produce the isotopic distribution of a formula
pub trait IsotopicDistributionGenerator {
    /// Generate the isotopologues of `formula`, in no particular order.
    fn isotopic_distribution(
        &mut self,
        formula: &Formula,
    ) -> Result<Vec<Isotopologue>, FormulaError>;
}

/// Generates isotopic distributions from the elemental isotope tables of
/// [`chemical_elements`], caching the distribution of every formula it has seen.
#[derive(Debug)]
pub struct ElementalIsotopicModel<'lifespan> {
    generator: BafflingRecursiveIsotopicPatternGenerator<'lifespan>,
    cache: HashMap<Formula, Vec<Isotopologue>>,
}

impl Default for ElementalIsotopicModel<'_> {
    fn default() -> Self {
        Self::new()
    }
}

impl<'lifespan> ElementalIsotopicModel<'lifespan> {
    pub fn new() -> Self {
        Self {
            generator: BafflingRecursiveIsotopicPatternGenerator::new(),
            cache: HashMap::new(),
        }
    }

    pub fn len(&self) -> usize {
        self.cache.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cache.is_empty()
    }

    pub fn clear(&mut self) {
        self.cache.clear();
    }

    fn generate(&mut self, formula: &Formula) -> Result<Vec<Isotopologue>, FormulaError> {
        if formula.is_empty() {
            return Ok(Vec::new());
        }
        let composition = formula.to_composition()?;
        // Patterns are generated as singly protonated ions and mapped back onto the
        // neutral mass of the formula.
        let peaks = self
            .generator
            .isotopic_variants(composition, 0, 1, PROTON);
        let pattern = TheoreticalIsotopicPattern::from(peaks);
        let variants: Vec<_> = pattern
            .peaks
            .iter()
            .map(|p| Isotopologue::new(neutral_mass(p.mz, 1, PROTON), p.intensity as f64))
            .collect();
        trace!("Generated {} isotopologues for {formula}", variants.len());
        Ok(variants)
    }
}

impl IsotopicDistributionGenerator for ElementalIsotopicModel<'_> {
    fn isotopic_distribution(
        &mut self,
        formula: &Formula,
    ) -> Result<Vec<Isotopologue>, FormulaError> {
        if let Some(hit) = self.cache.get(formula) {
            return Ok(hit.clone());
        }
        let variants = self.generate(formula)?;
        match self.cache.entry(formula.clone()) {
            Entry::Occupied(ent) => Ok(ent.get().clone()),
            Entry::Vacant(ent) => Ok(ent.insert(variants).clone()),
        }
    }
}
