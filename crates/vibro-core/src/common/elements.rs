//! Standard atomic masses (amu) and bound coherent neutron scattering lengths (fm).

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ElementData {
    pub symbol: &'static str,
    pub atomic_number: u32,
    pub mass: f64,
    pub coherent_scattering_length: f64,
}

const fn element(symbol: &'static str, atomic_number: u32, mass: f64, b: f64) -> ElementData {
    ElementData {
        symbol,
        atomic_number,
        mass,
        coherent_scattering_length: b,
    }
}

const ELEMENTS: &[ElementData] = &[
    element("H", 1, 1.008, -3.739),
    element("He", 2, 4.0026, 3.26),
    element("Li", 3, 6.94, -1.90),
    element("Be", 4, 9.0122, 7.79),
    element("B", 5, 10.81, 5.30),
    element("C", 6, 12.011, 6.646),
    element("N", 7, 14.007, 9.36),
    element("O", 8, 15.999, 5.803),
    element("F", 9, 18.998, 5.654),
    element("Ne", 10, 20.180, 4.566),
    element("Na", 11, 22.990, 3.63),
    element("Mg", 12, 24.305, 5.375),
    element("Al", 13, 26.982, 3.449),
    element("Si", 14, 28.085, 4.1491),
    element("P", 15, 30.974, 5.13),
    element("S", 16, 32.06, 2.847),
    element("Cl", 17, 35.45, 9.577),
    element("Ar", 18, 39.948, 1.909),
    element("K", 19, 39.098, 3.67),
    element("Ca", 20, 40.078, 4.70),
    element("Sc", 21, 44.956, 12.29),
    element("Ti", 22, 47.867, -3.438),
    element("V", 23, 50.942, -0.3824),
    element("Cr", 24, 51.996, 3.635),
    element("Mn", 25, 54.938, -3.73),
    element("Fe", 26, 55.845, 9.45),
    element("Co", 27, 58.933, 2.49),
    element("Ni", 28, 58.693, 10.3),
    element("Cu", 29, 63.546, 7.718),
    element("Zn", 30, 65.38, 5.68),
    element("Ga", 31, 69.723, 7.288),
    element("Ge", 32, 72.630, 8.185),
    element("As", 33, 74.922, 6.58),
    element("Se", 34, 78.971, 7.970),
    element("Br", 35, 79.904, 6.795),
    element("Kr", 36, 83.798, 7.81),
    element("Rb", 37, 85.468, 7.09),
    element("Sr", 38, 87.62, 7.02),
    element("Y", 39, 88.906, 7.75),
    element("Zr", 40, 91.224, 7.16),
    element("Nb", 41, 92.906, 7.054),
    element("Mo", 42, 95.95, 6.715),
    element("Tc", 43, 98.0, 6.8),
    element("Ru", 44, 101.07, 7.03),
    element("Rh", 45, 102.91, 5.88),
    element("Pd", 46, 106.42, 5.91),
    element("Ag", 47, 107.87, 5.922),
    element("Cd", 48, 112.41, 4.87),
    element("In", 49, 114.82, 4.065),
    element("Sn", 50, 118.71, 6.225),
    element("Sb", 51, 121.76, 5.57),
    element("Te", 52, 127.60, 5.80),
    element("I", 53, 126.90, 5.28),
    element("Xe", 54, 131.29, 4.92),
    element("Cs", 55, 132.91, 5.42),
    element("Ba", 56, 137.33, 5.07),
    element("La", 57, 138.91, 8.24),
    element("Ce", 58, 140.12, 4.84),
    element("Pr", 59, 140.91, 4.58),
    element("Nd", 60, 144.24, 7.69),
    element("Sm", 62, 150.36, 0.80),
    element("Eu", 63, 151.96, 7.22),
    element("Gd", 64, 157.25, 6.5),
    element("Tb", 65, 158.93, 7.38),
    element("Dy", 66, 162.50, 16.9),
    element("Ho", 67, 164.93, 8.01),
    element("Er", 68, 167.26, 7.79),
    element("Tm", 69, 168.93, 7.07),
    element("Yb", 70, 173.05, 12.43),
    element("Lu", 71, 174.97, 7.21),
    element("Hf", 72, 178.49, 7.77),
    element("Ta", 73, 180.95, 6.91),
    element("W", 74, 183.84, 4.86),
    element("Re", 75, 186.21, 9.2),
    element("Os", 76, 190.23, 10.7),
    element("Ir", 77, 192.22, 10.6),
    element("Pt", 78, 195.08, 9.60),
    element("Au", 79, 196.97, 7.63),
    element("Hg", 80, 200.59, 12.692),
    element("Tl", 81, 204.38, 8.776),
    element("Pb", 82, 207.2, 9.405),
    element("Bi", 83, 208.98, 8.532),
    element("Th", 90, 232.04, 10.31),
    element("U", 92, 238.03, 8.417),
];

/// Looks up an element, ignoring trailing digits used to tag inequivalent sites ("Fe1").
pub fn element_by_symbol(symbol: &str) -> Option<&'static ElementData> {
    let bare = symbol.trim().trim_end_matches(|c: char| c.is_ascii_digit());
    ELEMENTS
        .iter()
        .find(|element| element.symbol.eq_ignore_ascii_case(bare))
}

pub fn atomic_mass(symbol: &str) -> Option<f64> {
    element_by_symbol(symbol).map(|element| element.mass)
}

pub fn coherent_scattering_length(symbol: &str) -> Option<f64> {
    element_by_symbol(symbol).map(|element| element.coherent_scattering_length)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn looks_up_tagged_symbols() {
        let silicon = element_by_symbol("Si2").expect("Si should be tabulated");
        assert_eq!(silicon.atomic_number, 14);
        assert!((silicon.mass - 28.085).abs() < 1.0e-9);
        assert!(element_by_symbol("Xx").is_none());
    }

    #[test]
    fn hydrogen_has_negative_scattering_length() {
        assert!(coherent_scattering_length("H").is_some_and(|b| b < 0.0));
    }
}
