//! Dielectric tensors, Born charges, Raman tensors and NLO susceptibility of
//! a finished workflow, presented one site at a time.

pub mod tensor;

pub use tensor::{TensorCell, TensorPanel, ZERO_ABSOLUTE_TOLERANCE, ZERO_RELATIVE_TOLERANCE};

use crate::domain::{AccuracyTier, Rank3, VibrationalData, VibrationalTiers, VibroError, VibroResult};
use crate::numerics::vector::{Mat3, Vec3};
use crate::workflow::WorkflowOutputs;
use serde::{Deserialize, Serialize};
use tracing::debug;

pub const NLO_UNIT: &str = "pm/V";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SiteEntry {
    pub index: usize,
    pub symbol: String,
    /// Fractional coordinates.
    pub position: Vec3,
}

/// Serialisable state of the view for the selected site.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DielectricSnapshot {
    pub tier: AccuracyTier,
    pub selected_site: usize,
    pub sites: Vec<SiteEntry>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub dielectric: Option<TensorPanel>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub born_charges: Option<TensorPanel>,
    /// One panel per displacement direction x, y, z.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub raman_tensors: Option<Vec<TensorPanel>>,
    /// One panel per first index of χ⁽²⁾, in pm/V.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub nlo_susceptibility: Option<Vec<TensorPanel>>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct DielectricView {
    tier: AccuracyTier,
    data: VibrationalData,
    selected: usize,
}

impl DielectricView {
    /// Picks the highest-priority accuracy tier.
    pub fn from_tiers(tiers: &VibrationalTiers) -> VibroResult<Self> {
        let (tier, data) = tiers
            .best()
            .ok_or_else(|| VibroError::invalid_input("no vibrational data in the workflow outputs"))?;
        debug!(tier = %tier, "selected dielectric tier");
        Ok(Self {
            tier,
            data: data.clone(),
            selected: 0,
        })
    }

    pub fn from_outputs(outputs: &WorkflowOutputs) -> VibroResult<Self> {
        Self::from_tiers(&outputs.vibrational_data)
    }

    pub fn tier(&self) -> AccuracyTier {
        self.tier
    }

    pub fn selected_site(&self) -> usize {
        self.selected
    }

    pub fn sites(&self) -> Vec<SiteEntry> {
        self.data
            .structure
            .sites()
            .iter()
            .enumerate()
            .map(|(index, site)| SiteEntry {
                index,
                symbol: site.symbol.clone(),
                position: site.position,
            })
            .collect()
    }

    /// Switches the per-site panels to site `index`.
    pub fn select_site(&mut self, index: usize) -> VibroResult<()> {
        let atoms = self.data.num_atoms();
        if index >= atoms {
            return Err(VibroError::invalid_input(format!(
                "site {index} is out of range, the structure has {atoms} sites"
            )));
        }
        self.selected = index;
        Ok(())
    }

    pub fn dielectric(&self) -> Option<TensorPanel> {
        self.data.dielectric.as_ref().map(TensorPanel::from_matrix)
    }

    pub fn born_charges(&self) -> Option<TensorPanel> {
        self.born_tensor().map(TensorPanel::from_matrix)
    }

    fn born_tensor(&self) -> Option<&Mat3> {
        self.data.born_charges.as_ref()?.get(self.selected)
    }

    pub fn raman_tensors(&self) -> Option<Vec<TensorPanel>> {
        let tensors = self.data.raman_tensors.as_ref()?.get(self.selected)?;
        Some(TensorPanel::from_stack(tensors))
    }

    pub fn nlo_susceptibility(&self) -> Option<Vec<TensorPanel>> {
        self.data.nlo_susceptibility.as_ref().map(|chi: &Rank3| TensorPanel::from_stack(chi))
    }

    pub fn snapshot(&self) -> DielectricSnapshot {
        DielectricSnapshot {
            tier: self.tier,
            selected_site: self.selected,
            sites: self.sites(),
            dielectric: self.dielectric(),
            born_charges: self.born_charges(),
            raman_tensors: self.raman_tensors(),
            nlo_susceptibility: self.nlo_susceptibility(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{Periodicity, Site, Structure};

    fn tier_data(scale: f64) -> VibrationalData {
        let structure = Structure::new(
            [[4.0, 0.0, 0.0], [0.0, 4.0, 0.0], [0.0, 0.0, 4.0]],
            vec![Site::new("Mg", [0.0; 3]), Site::new("O", [0.5, 0.5, 0.5])],
            Periodicity::Bulk,
        )
        .expect("structure should be valid");
        let mut data = VibrationalData::new(structure);
        data.dielectric = Some([[3.0 * scale, 0.0, 0.0], [0.0, 3.0 * scale, 0.0], [0.0, 0.0, 3.0 * scale]]);
        data.born_charges = Some(vec![
            [[2.0, 0.0, 0.0], [0.0, 2.0, 0.0], [0.0, 0.0, 2.0]],
            [[-2.0, 0.0, 0.0], [0.0, -2.0, 1.0e-9], [0.0, 0.0, -2.0]],
        ]);
        data
    }

    #[test]
    fn highest_tier_and_site_selection() {
        let tiers: VibrationalTiers = [
            (AccuracyTier::NumericalAccuracy2, tier_data(1.0)),
            (AccuracyTier::NumericalAccuracy4, tier_data(2.0)),
        ]
        .into_iter()
        .collect();
        let mut view = DielectricView::from_tiers(&tiers).expect("view should build");
        assert_eq!(view.tier(), AccuracyTier::NumericalAccuracy4);
        let dielectric = view.dielectric().expect("dielectric present");
        assert_eq!(dielectric.rows[0][0].value, 6.0);
        assert!(dielectric.rows[0][1].zero_by_symmetry);

        view.select_site(1).expect("site 1 exists");
        let born = view.born_charges().expect("charges present");
        assert_eq!(born.rows[0][0].value, -2.0);
        assert!(born.rows[1][2].zero_by_symmetry);
        assert!(view.select_site(2).is_err());
        assert!(view.raman_tensors().is_none());
    }

    #[test]
    fn empty_outputs_are_rejected() {
        assert!(DielectricView::from_tiers(&VibrationalTiers::new()).is_err());
    }
}
