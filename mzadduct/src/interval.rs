/** An inclusive interval over a single dimension
*/
pub trait Span1D {
    type DimType: PartialOrd;

    fn start(&self) -> &Self::DimType;
    fn end(&self) -> &Self::DimType;

    fn contains(&self, i: &Self::DimType) -> bool {
        self.start() <= i && i <= self.end()
    }

    fn overlaps<T: Span1D<DimType = Self::DimType>>(&self, interval: &T) -> bool {
        self.start() <= interval.end() && interval.start() <= self.end()
    }
}

impl<T> Span1D for &T
where
    T: Span1D,
{
    type DimType = T::DimType;

    fn start(&self) -> &Self::DimType {
        (*self).start()
    }

    fn end(&self) -> &Self::DimType {
        (*self).end()
    }
}

#[derive(Debug, Default, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct SimpleInterval<V: PartialOrd> {
    pub start: V,
    pub end: V,
}

impl<V: PartialOrd> SimpleInterval<V> {
    pub fn new(start: V, end: V) -> SimpleInterval<V> {
        SimpleInterval { start, end }
    }
}

impl<V: PartialOrd> Span1D for SimpleInterval<V> {
    type DimType = V;

    fn start(&self) -> &Self::DimType {
        &self.start
    }

    fn end(&self) -> &Self::DimType {
        &self.end
    }
}

/// The matching window around a target mass
pub type MassWindow = SimpleInterval<f64>;

impl MassWindow {
    /// The window `[center - left, center + right]`
    pub fn around(center: f64, left: f64, right: f64) -> Self {
        Self::new(center - left, center + right)
    }
}

/// The indices of all `values` falling inside `span`
pub fn indices_within<S: Span1D<DimType = f64>>(span: &S, values: &[f64]) -> Vec<usize> {
    values
        .iter()
        .enumerate()
        .filter(|(_, v)| span.contains(*v))
        .map(|(i, _)| i)
        .collect()
}
