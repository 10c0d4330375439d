/// A distinct knot value and how many times it repeats in a knot vector
#[derive(Clone, Copy, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct KnotMultiplicity<T> {
    knot: T,
    multiplicity: usize,
}

impl<T> KnotMultiplicity<T> {
    pub fn new(knot: T, multiplicity: usize) -> Self {
        Self { knot, multiplicity }
    }

    pub fn knot(&self) -> &T {
        &self.knot
    }

    pub fn multiplicity(&self) -> usize {
        self.multiplicity
    }
}
