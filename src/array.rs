//! Dense n-dimensional arrays.
//!
//! Arrays are stored row-major. Besides value arrays, the same container
//! carries boolean masks and the integer tag codes used by path translation.

use std::fmt::{self, Debug, Display, Formatter};

use crate::path::{Index, Path, Slice};
use crate::value::{Scalar, ValueError};

/// A dense, row-major n-dimensional array.
#[derive(Clone, PartialEq, Eq, Hash)]
pub struct NdArray<T> {
    shape: Vec<usize>,
    data: Vec<T>,
}

/// An array of numeric scalars.
pub type Array = NdArray<Scalar>;

/// A boolean array selecting elements of another array of the same shape.
pub type Mask = NdArray<bool>;

/// An array of integer tags. Negative tags mark elements that do not stem
/// from the source under consideration.
pub type Codes = NdArray<i64>;

impl<T> NdArray<T> {
    /// Creates an array from a shape and row-major data.
    pub fn new(shape: Vec<usize>, data: Vec<T>) -> Result<Self, ValueError> {
        let size: usize = shape.iter().product();
        if size != data.len() {
            return Err(ValueError::Shape(format!(
                "cannot fill shape {shape:?} with {} elements",
                data.len()
            )));
        }
        Ok(Self { shape, data })
    }

    /// Creates a one-dimensional array.
    pub fn from_vec(data: Vec<T>) -> Self {
        Self { shape: vec![data.len()], data }
    }

    /// Creates a zero-dimensional array holding a single element.
    pub fn scalar(item: T) -> Self {
        Self { shape: vec![], data: vec![item] }
    }

    pub fn shape(&self) -> &[usize] {
        &self.shape
    }

    pub fn ndim(&self) -> usize {
        self.shape.len()
    }

    /// The total number of elements.
    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// The elements in row-major order.
    pub fn data(&self) -> &[T] {
        &self.data
    }

    pub fn into_data(self) -> Vec<T> {
        self.data
    }

    pub fn iter(&self) -> std::slice::Iter<'_, T> {
        self.data.iter()
    }

    /// The element of a zero-dimensional array.
    pub fn item(&self) -> Option<&T> {
        if self.shape.is_empty() { self.data.first() } else { None }
    }

    /// The element at a multi-dimensional position.
    pub fn at(&self, position: &[usize]) -> Option<&T> {
        if position.len() != self.shape.len()
            || position.iter().zip(&self.shape).any(|(&p, &n)| p >= n)
        {
            return None;
        }
        self.data.get(ravel(position, &self.shape))
    }

    /// Applies a function to every element.
    pub fn map<U>(&self, f: impl FnMut(&T) -> U) -> NdArray<U> {
        NdArray { shape: self.shape.clone(), data: self.data.iter().map(f).collect() }
    }

    /// Applies a fallible function to every element.
    pub fn try_map<U, E>(&self, f: impl FnMut(&T) -> Result<U, E>) -> Result<NdArray<U>, E> {
        let data = self.data.iter().map(f).collect::<Result<_, _>>()?;
        Ok(NdArray { shape: self.shape.clone(), data })
    }

    /// Reinterprets the data under a new shape of equal size.
    pub fn reshape(self, shape: Vec<usize>) -> Result<Self, ValueError> {
        Self::new(shape, self.data)
    }
}

impl<T: Clone> NdArray<T> {
    /// Creates an array of the given shape filled with one element.
    pub fn full(shape: &[usize], item: T) -> Self {
        let size = shape.iter().product();
        Self { shape: shape.to_vec(), data: vec![item; size] }
    }

    /// Flattens into one dimension.
    pub fn flatten(&self) -> Self {
        Self::from_vec(self.data.clone())
    }

    /// Broadcasts to a larger shape following the usual trailing-axis rules.
    pub fn broadcast_to(&self, shape: &[usize]) -> Result<Self, ValueError> {
        if self.shape == shape {
            return Ok(self.clone());
        }
        let joined = broadcast_shapes(&self.shape, shape)?;
        if joined != shape {
            return Err(ValueError::Shape(format!(
                "cannot broadcast {:?} to {shape:?}",
                self.shape
            )));
        }
        let offset = shape.len() - self.shape.len();
        let size: usize = shape.iter().product();
        let mut data = Vec::with_capacity(size);
        let mut source = vec![0; self.shape.len()];
        for flat in 0..size {
            let position = unravel(flat, shape);
            for (axis, slot) in source.iter_mut().enumerate() {
                *slot = if self.shape[axis] == 1 { 0 } else { position[axis + offset] };
            }
            data.push(self.data[ravel(&source, &self.shape)].clone());
        }
        Ok(Self { shape: shape.to_vec(), data })
    }

    /// Combines two arrays element by element after broadcasting them.
    pub fn zip_with<U: Clone, V>(
        &self,
        other: &NdArray<U>,
        mut f: impl FnMut(&T, &U) -> V,
    ) -> Result<NdArray<V>, ValueError> {
        let shape = broadcast_shapes(&self.shape, &other.shape)?;
        let lhs = self.broadcast_to(&shape)?;
        let rhs = other.broadcast_to(&shape)?;
        let data = lhs.data.iter().zip(&rhs.data).map(|(a, b)| f(a, b)).collect();
        Ok(NdArray { shape, data })
    }

    /// Selects the elements addressed by an index.
    pub fn select(&self, index: &Index) -> Result<Self, ValueError> {
        Region::whole(&self.shape).select(index).map(|region| self.gather(&region))
    }

    /// Selects the elements addressed by a sequence of indices.
    pub fn select_path(&self, path: &Path) -> Result<Self, ValueError> {
        Region::of_path(&self.shape, path).map(|region| self.gather(&region))
    }

    /// Collects the elements of a region into a new array.
    pub fn gather(&self, region: &Region) -> Self {
        let data = region.flat.iter().map(|&i| self.data[i].clone()).collect();
        Self { shape: region.shape.clone(), data }
    }

    /// Writes values into the elements addressed by an index, broadcasting
    /// the values to the shape of the selection.
    pub fn assign(&mut self, index: &Index, values: &Self) -> Result<(), ValueError> {
        let region = Region::whole(&self.shape).select(index)?;
        self.scatter(&region, values)
    }

    /// Writes values into the elements of a region.
    pub fn scatter(&mut self, region: &Region, values: &Self) -> Result<(), ValueError> {
        let values = values.broadcast_to(&region.shape)?;
        for (&i, value) in region.flat.iter().zip(values.data) {
            self.data[i] = value;
        }
        Ok(())
    }

    /// Permutes the axes.
    pub fn permute(&self, axes: &[usize]) -> Result<Self, ValueError> {
        let mut sorted = axes.to_vec();
        sorted.sort_unstable();
        if sorted != (0..self.ndim()).collect::<Vec<_>>() {
            return Err(ValueError::Shape(format!(
                "{axes:?} is not a permutation of the axes of {:?}",
                self.shape
            )));
        }
        let shape: Vec<usize> = axes.iter().map(|&a| self.shape[a]).collect();
        let mut source = vec![0; axes.len()];
        let data = (0..self.len())
            .map(|flat| {
                let position = unravel(flat, &shape);
                for (i, &a) in axes.iter().enumerate() {
                    source[a] = position[i];
                }
                self.data[ravel(&source, &self.shape)].clone()
            })
            .collect();
        Ok(Self { shape, data })
    }

    /// Reverses the order of the axes.
    pub fn transpose(&self) -> Self {
        let axes: Vec<usize> = (0..self.ndim()).rev().collect();
        match self.permute(&axes) {
            Ok(array) => array,
            Err(_) => unreachable!("reversed axes always form a permutation"),
        }
    }

    /// Reverses the order of elements along one axis, or along all of them.
    pub fn flip(&self, axis: Option<usize>) -> Result<Self, ValueError> {
        let axes: Vec<usize> = match axis {
            Some(axis) => vec![self.check_axis(axis)?],
            None => (0..self.ndim()).collect(),
        };
        let data = (0..self.len())
            .map(|flat| {
                let mut position = unravel(flat, &self.shape);
                for &a in &axes {
                    position[a] = self.shape[a] - 1 - position[a];
                }
                self.data[ravel(&position, &self.shape)].clone()
            })
            .collect();
        Ok(Self { shape: self.shape.clone(), data })
    }

    /// Rotates by 90 degrees `k` times in the plane of the first two axes.
    pub fn rot90(&self, k: i64) -> Result<Self, ValueError> {
        if self.ndim() < 2 {
            return Err(ValueError::Shape("rot90 needs at least two axes".into()));
        }
        let mut swapped: Vec<usize> = (0..self.ndim()).collect();
        swapped.swap(0, 1);
        match k.rem_euclid(4) {
            0 => Ok(self.clone()),
            1 => self.flip(Some(1))?.permute(&swapped),
            2 => self.flip(Some(0))?.flip(Some(1)),
            _ => self.permute(&swapped)?.flip(Some(1)),
        }
    }

    /// Joins arrays along an existing axis.
    pub fn concatenate(arrays: &[Self], axis: usize) -> Result<Self, ValueError> {
        let Some(first) = arrays.first() else {
            return Err(ValueError::Shape("need at least one array to concatenate".into()));
        };
        first.check_axis(axis)?;
        let mut shape = first.shape.clone();
        shape[axis] = 0;
        for array in arrays {
            let compatible = array.ndim() == first.ndim()
                && array
                    .shape
                    .iter()
                    .zip(&first.shape)
                    .enumerate()
                    .all(|(a, (x, y))| a == axis || x == y);
            if !compatible {
                return Err(ValueError::Shape(format!(
                    "cannot concatenate {:?} with {:?} along axis {axis}",
                    first.shape, array.shape
                )));
            }
            shape[axis] += array.shape[axis];
        }
        let outer: usize = first.shape[..axis].iter().product();
        let mut data = Vec::with_capacity(shape.iter().product());
        for o in 0..outer {
            for array in arrays {
                let chunk: usize = array.shape[axis..].iter().product();
                data.extend_from_slice(&array.data[o * chunk..(o + 1) * chunk]);
            }
        }
        Ok(Self { shape, data })
    }

    /// Repeats every element, along one axis or over the flattened array.
    pub fn repeat(&self, repeats: usize, axis: Option<usize>) -> Result<Self, ValueError> {
        let Some(axis) = axis else {
            let data = self
                .data
                .iter()
                .flat_map(|x| std::iter::repeat_n(x.clone(), repeats))
                .collect();
            return Ok(Self { shape: vec![self.len() * repeats], data });
        };
        self.check_axis(axis)?;
        let mut shape = self.shape.clone();
        shape[axis] *= repeats;
        let size: usize = shape.iter().product();
        let data = (0..size)
            .map(|flat| {
                let mut position = unravel(flat, &shape);
                position[axis] /= repeats;
                self.data[ravel(&position, &self.shape)].clone()
            })
            .collect();
        Ok(Self { shape, data })
    }

    /// Folds the elements along one axis, dropping that axis.
    pub fn fold_axis<U: Clone>(
        &self,
        axis: usize,
        init: U,
        mut f: impl FnMut(&mut U, &T),
    ) -> Result<NdArray<U>, ValueError> {
        self.check_axis(axis)?;
        let mut shape = self.shape.clone();
        shape.remove(axis);
        let mut out = NdArray::full(&shape, init);
        for (flat, item) in self.data.iter().enumerate() {
            let mut position = unravel(flat, &self.shape);
            position.remove(axis);
            f(&mut out.data[ravel(&position, &shape)], item);
        }
        Ok(out)
    }

    /// Running accumulation along one axis, keeping the shape.
    pub fn scan_axis(
        &self,
        axis: usize,
        mut f: impl FnMut(&T, &T) -> T,
    ) -> Result<Self, ValueError> {
        self.check_axis(axis)?;
        let stride: usize = self.shape[axis + 1..].iter().product();
        let mut data: Vec<T> = Vec::with_capacity(self.len());
        for (flat, item) in self.data.iter().enumerate() {
            let first = unravel(flat, &self.shape)[axis] == 0;
            let next = if first { item.clone() } else { f(&data[flat - stride], item) };
            data.push(next);
        }
        Ok(Self { shape: self.shape.clone(), data })
    }

    fn check_axis(&self, axis: usize) -> Result<usize, ValueError> {
        if axis < self.ndim() {
            Ok(axis)
        } else {
            Err(ValueError::Shape(format!(
                "axis {axis} is out of bounds for shape {:?}",
                self.shape
            )))
        }
    }
}

impl Codes {
    /// The codes `0..n` laid out in the given shape.
    pub fn indices(shape: &[usize]) -> Self {
        let size: usize = shape.iter().product();
        Self { shape: shape.to_vec(), data: (0..size as i64).collect() }
    }
}

impl Mask {
    /// A mask selecting nothing.
    pub fn none(shape: &[usize]) -> Self {
        Self::full(shape, false)
    }

    /// Whether any element is selected.
    pub fn any(&self) -> bool {
        self.data.iter().any(|&b| b)
    }

    /// Whether all elements are selected.
    pub fn all(&self) -> bool {
        self.data.iter().all(|&b| b)
    }

    /// The number of selected elements.
    pub fn count(&self) -> usize {
        self.data.iter().filter(|&&b| b).count()
    }

    /// Selects an element at a flat position.
    pub fn set_flat(&mut self, flat: usize) {
        self.data[flat] = true;
    }

    /// Element-wise conjunction of two masks of equal shape.
    pub fn and(&self, other: &Mask) -> Mask {
        self.combine(other, |a, b| a && b)
    }

    /// Element-wise disjunction of two masks of equal shape.
    pub fn or(&self, other: &Mask) -> Mask {
        self.combine(other, |a, b| a || b)
    }

    /// Element-wise negation.
    pub fn not(&self) -> Mask {
        self.map(|&b| !b)
    }

    fn combine(&self, other: &Mask, f: impl Fn(bool, bool) -> bool) -> Mask {
        debug_assert_eq!(self.shape, other.shape);
        let data = self.data.iter().zip(&other.data).map(|(&a, &b)| f(a, b)).collect();
        Mask { shape: self.shape.clone(), data }
    }
}

impl<T: Debug> Debug for NdArray<T> {
    fn fmt(&self, f: &mut Formatter) -> fmt::Result {
        write!(f, "NdArray({:?}, {:?})", self.shape, self.data)
    }
}

impl<T: Display> Display for NdArray<T> {
    fn fmt(&self, f: &mut Formatter) -> fmt::Result {
        fn nested<T: Display>(
            f: &mut Formatter,
            shape: &[usize],
            data: &[T],
        ) -> fmt::Result {
            let Some((&n, rest)) = shape.split_first() else {
                return write!(f, "{}", data[0]);
            };
            let chunk: usize = rest.iter().product();
            f.write_str("[")?;
            for i in 0..n {
                if i > 0 {
                    f.write_str(", ")?;
                }
                nested(f, rest, &data[i * chunk..(i + 1) * chunk])?;
            }
            f.write_str("]")
        }
        if self.data.is_empty() {
            return f.write_str("[]");
        }
        nested(f, &self.shape, &self.data)
    }
}

/// The flat positions addressed within an array of some shape, together
/// with the shape the selection takes on.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Region {
    /// Flat positions in the original array, in the selection's row-major
    /// order.
    pub flat: Vec<usize>,
    /// The shape of the selection.
    pub shape: Vec<usize>,
}

impl Region {
    /// The region covering a whole array.
    pub fn whole(shape: &[usize]) -> Self {
        let size: usize = shape.iter().product();
        Self { flat: (0..size).collect(), shape: shape.to_vec() }
    }

    /// The region addressed by a path of array indices.
    pub fn of_path(shape: &[usize], path: &Path) -> Result<Self, ValueError> {
        path.iter()
            .try_fold(Self::whole(shape), |region, component| region.select(&component.index))
    }

    /// Narrows this region further by an index applied to its shape.
    pub fn select(&self, index: &Index) -> Result<Self, ValueError> {
        let (positions, shape) = positions(&self.shape, index)?;
        let flat = positions.into_iter().map(|p| self.flat[p]).collect();
        Ok(Self { flat, shape })
    }

    /// The region as a mask over an array of the given shape.
    pub fn to_mask(&self, shape: &[usize]) -> Mask {
        let mut mask = Mask::none(shape);
        for &i in &self.flat {
            mask.data[i] = true;
        }
        mask
    }
}

/// The mask of the elements a path addresses in an array of some shape.
pub fn path_mask(shape: &[usize], path: &Path) -> Result<Mask, ValueError> {
    Region::of_path(shape, path).map(|region| region.to_mask(shape))
}

/// The shape two shapes broadcast to.
pub fn broadcast_shapes(a: &[usize], b: &[usize]) -> Result<Vec<usize>, ValueError> {
    let ndim = a.len().max(b.len());
    let dim = |shape: &[usize], i: usize| {
        let offset = ndim - shape.len();
        if i < offset { 1 } else { shape[i - offset] }
    };
    (0..ndim)
        .map(|i| match (dim(a, i), dim(b, i)) {
            (x, y) if x == y => Ok(x),
            (1, y) => Ok(y),
            (x, 1) => Ok(x),
            _ => Err(ValueError::Shape(format!("shapes {a:?} and {b:?} do not broadcast"))),
        })
        .collect()
}

/// Converts a flat position into a multi-dimensional one.
pub fn unravel(mut flat: usize, shape: &[usize]) -> Vec<usize> {
    let mut position = vec![0; shape.len()];
    for (slot, &n) in position.iter_mut().zip(shape).rev() {
        if n > 0 {
            *slot = flat % n;
            flat /= n;
        }
    }
    position
}

/// Converts a multi-dimensional position into a flat one.
pub fn ravel(position: &[usize], shape: &[usize]) -> usize {
    position.iter().zip(shape).fold(0, |acc, (&p, &n)| acc * n + p)
}

/// What an index selects along a single axis.
enum AxisSelection {
    /// A single position; the axis is dropped.
    One(usize),
    /// Several positions; the axis is kept.
    Many(Vec<usize>),
}

/// Resolves an index against a shape into flat positions and the selection
/// shape.
fn positions(shape: &[usize], index: &Index) -> Result<(Vec<usize>, Vec<usize>), ValueError> {
    match index {
        Index::Int(_) | Index::Slice(_) => axes(shape, std::slice::from_ref(index)),
        Index::Tuple(items) => axes(shape, items),
        Index::Mask(mask) => masked(shape, mask),
        Index::Key(key) => Err(ValueError::BadIndex {
            kind: "array",
            index: format!("'{key}'"),
        }),
    }
}

fn axes(shape: &[usize], items: &[Index]) -> Result<(Vec<usize>, Vec<usize>), ValueError> {
    if items.len() > shape.len() {
        return Err(ValueError::BadIndex {
            kind: "array",
            index: format!("{} indices for {} axes", items.len(), shape.len()),
        });
    }
    let mut selections = Vec::with_capacity(shape.len());
    for (axis, &n) in shape.iter().enumerate() {
        let selection = match items.get(axis) {
            None => AxisSelection::Many((0..n).collect()),
            Some(Index::Int(i)) => AxisSelection::One(normalize(*i, n)?),
            Some(Index::Slice(slice)) => AxisSelection::Many(slice.indices(n)),
            Some(other) => {
                return Err(ValueError::BadIndex {
                    kind: "array axis",
                    index: format!("{other:?}"),
                });
            }
        };
        selections.push(selection);
    }

    let mut out_shape = vec![];
    let mut flat = vec![0];
    for (axis, selection) in selections.iter().enumerate() {
        let stride: usize = shape[axis + 1..].iter().product();
        let picks: &[usize] = match selection {
            AxisSelection::One(i) => std::slice::from_ref(i),
            AxisSelection::Many(v) => {
                out_shape.push(v.len());
                v
            }
        };
        flat = flat
            .iter()
            .flat_map(|&base| picks.iter().map(move |&p| base + p * stride))
            .collect();
    }
    Ok((flat, out_shape))
}

fn masked(shape: &[usize], mask: &Mask) -> Result<(Vec<usize>, Vec<usize>), ValueError> {
    let lead = mask.ndim();
    if lead == 0 || lead > shape.len() || mask.shape() != &shape[..lead] {
        return Err(ValueError::Shape(format!(
            "boolean index of shape {:?} does not match shape {shape:?}",
            mask.shape()
        )));
    }
    let inner: usize = shape[lead..].iter().product();
    let mut flat = vec![];
    for (i, _) in mask.iter().enumerate().filter(|(_, b)| **b) {
        flat.extend(i * inner..(i + 1) * inner);
    }
    let mut out_shape = vec![mask.count()];
    out_shape.extend_from_slice(&shape[lead..]);
    Ok((flat, out_shape))
}

/// Resolves a possibly negative index against an axis length.
pub fn normalize(index: i64, len: usize) -> Result<usize, ValueError> {
    let resolved = if index < 0 { index + len as i64 } else { index };
    if resolved < 0 || resolved >= len as i64 {
        return Err(ValueError::OutOfBounds { index, len });
    }
    Ok(resolved as usize)
}

impl Slice {
    /// The positions this slice selects along an axis of the given length.
    pub fn indices(&self, len: usize) -> Vec<usize> {
        let n = len as i64;
        let step = self.step;
        let resolve = |x: i64, low: i64, high: i64| {
            let x = if x < 0 { x + n } else { x };
            x.clamp(low, high)
        };
        let mut out = vec![];
        if step > 0 {
            let start = self.start.map_or(0, |s| resolve(s, 0, n));
            let stop = self.stop.map_or(n, |s| resolve(s, 0, n));
            let mut i = start;
            while i < stop {
                out.push(i as usize);
                i += step;
            }
        } else if step < 0 {
            let start = self.start.map_or(n - 1, |s| resolve(s, -1, n - 1));
            let stop = self.stop.map_or(-1, |s| resolve(s, -1, n - 1));
            let mut i = start;
            while i > stop {
                out.push(i as usize);
                i += step;
            }
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::path;

    fn grid() -> Codes {
        Codes::indices(&[3, 4])
    }

    #[test]
    fn test_slice_indices() {
        assert_eq!(Slice::new(Some(1), None, 1).indices(5), vec![1, 2, 3, 4]);
        assert_eq!(Slice::new(None, None, -1).indices(4), vec![3, 2, 1, 0]);
        assert_eq!(Slice::new(Some(-2), None, 1).indices(5), vec![3, 4]);
        assert_eq!(Slice::new(None, Some(-1), 2).indices(6), vec![0, 2, 4]);
        assert_eq!(Slice::new(Some(10), None, 1).indices(3), Vec::<usize>::new());
    }

    #[test]
    fn test_select_rows_and_columns() {
        let codes = grid();
        let row = codes.select(&Index::Int(1)).unwrap();
        assert_eq!(row.shape(), &[4]);
        assert_eq!(row.data(), &[4, 5, 6, 7]);

        let column = codes.select_path(&path![(Slice::full(), -1)]).unwrap();
        assert_eq!(column.data(), &[3, 7, 11]);

        let single = codes.select_path(&path![(2, 1)]).unwrap();
        assert_eq!(single.item(), Some(&9));
    }

    #[test]
    fn test_select_mask() {
        let codes = Codes::indices(&[4]);
        let mask = Mask::from_vec(vec![true, false, false, true]);
        assert_eq!(codes.select(&Index::Mask(mask)).unwrap().data(), &[0, 3]);

        let rows = Mask::from_vec(vec![false, true, true]);
        let picked = grid().select(&Index::Mask(rows)).unwrap();
        assert_eq!(picked.shape(), &[2, 4]);
        assert_eq!(picked.data()[0], 4);
    }

    #[test]
    fn test_out_of_bounds() {
        let codes = grid();
        assert_eq!(
            codes.select(&Index::Int(3)),
            Err(ValueError::OutOfBounds { index: 3, len: 3 })
        );
        assert!(codes.select(&Index::Key("x".into())).is_err());
    }

    #[test]
    fn test_nested_region() {
        let mask = path_mask(&[3, 4], &path![1, Slice::new(Some(2), None, 1)]).unwrap();
        assert_eq!(mask.count(), 2);
        assert!(mask.data()[6] && mask.data()[7]);
    }

    #[test]
    fn test_assign_broadcasts() {
        let mut codes = grid();
        codes.assign(&Index::Int(0), &Codes::scalar(-1)).unwrap();
        assert_eq!(&codes.data()[..5], &[-1, -1, -1, -1, 4]);
    }

    #[test]
    fn test_broadcast() {
        let row = Codes::from_vec(vec![1, 2, 3]);
        let sum = row.zip_with(&Codes::new(vec![2, 1], vec![10, 20]).unwrap(), |a, b| a + b);
        let sum = sum.unwrap();
        assert_eq!(sum.shape(), &[2, 3]);
        assert_eq!(sum.data(), &[11, 12, 13, 21, 22, 23]);
        assert!(broadcast_shapes(&[2], &[3]).is_err());
    }

    #[test]
    fn test_reshaping_operations() {
        let codes = Codes::indices(&[2, 3]);
        assert_eq!(codes.transpose().data(), &[0, 3, 1, 4, 2, 5]);
        assert_eq!(codes.flip(Some(1)).unwrap().data(), &[2, 1, 0, 5, 4, 3]);
        assert_eq!(codes.rot90(1).unwrap().data(), &[2, 5, 1, 4, 0, 3]);
        assert_eq!(codes.rot90(1).unwrap().shape(), &[3, 2]);
        assert_eq!(codes.repeat(2, Some(0)).unwrap().shape(), &[4, 3]);
        assert_eq!(codes.repeat(2, None).unwrap().data()[..4], [0, 0, 1, 1]);

        let joined = Codes::concatenate(&[codes.clone(), codes.clone()], 1).unwrap();
        assert_eq!(joined.shape(), &[2, 6]);
        assert_eq!(joined.data(), &[0, 1, 2, 0, 1, 2, 3, 4, 5, 3, 4, 5]);
    }

    #[test]
    fn test_fold_and_scan() {
        let codes = Codes::indices(&[2, 3]);
        let sums = codes.fold_axis(0, 0, |acc, x| *acc += x).unwrap();
        assert_eq!(sums.data(), &[3, 5, 7]);
        let running = codes.scan_axis(1, |a, b| a + b).unwrap();
        assert_eq!(running.data(), &[0, 1, 3, 3, 7, 12]);
    }

    #[test]
    fn test_display() {
        let codes = Codes::indices(&[2, 2]);
        assert_eq!(codes.to_string(), "[[0, 1], [2, 3]]");
        assert_eq!(Codes::scalar(4).to_string(), "4");
    }
}
