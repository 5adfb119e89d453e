use super::*;

/// Batched feature-map matrix exchanged between layers.
///
/// Logically this is a column-major matrix with one column per batch sample, whose rows are
/// the pixels of every feature map of that sample, map after map, each map flattened row by
/// row. Column-major storage means the pixels of one sample are contiguous, and so are the
/// pixels of one (sample, map) pair, which starts at `(sample * maps + map) * area`. That
/// contiguity is what lets a single z-batched launch walk over all maps of all samples with
/// one stride.
///
/// There is no trailing constant row: bias is added by an explicit broadcast in the layers.
///
/// # Example
/// ```rust
/// use rustycnn::neural_network::{FeatureMaps, Size};
///
/// // 2 samples, 3 maps of 4x4 pixels
/// let maps = FeatureMaps::from_shape_fn(3, Size::new(4, 4), 2, |b, m, r, c| (b + m + r + c) as f32);
///
/// assert_eq!(maps.rows(), 3 * 16);
/// assert_eq!(maps.batch_size(), 2);
/// assert_eq!(maps.image(1, 2)[[3, 3]], 9.0);
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct FeatureMaps {
    maps: usize,
    image_size: Size,
    batch_size: usize,
    data: Vec<f32>,
}

impl FeatureMaps {
    /// Creates a zero-filled matrix.
    pub fn zeros(maps: usize, image_size: Size, batch_size: usize) -> Self {
        FeatureMaps {
            maps,
            image_size,
            batch_size,
            data: vec![0.0; maps * image_size.area() * batch_size],
        }
    }

    /// Creates a matrix whose pixel `(row, col)` of map `map` in sample `sample` is
    /// `f(sample, map, row, col)`.
    pub fn from_shape_fn<F>(maps: usize, image_size: Size, batch_size: usize, mut f: F) -> Self
    where
        F: FnMut(usize, usize, usize, usize) -> f32,
    {
        let mut data = Vec::with_capacity(maps * image_size.area() * batch_size);
        for b in 0..batch_size {
            for m in 0..maps {
                for r in 0..image_size.rows {
                    for c in 0..image_size.cols {
                        data.push(f(b, m, r, c));
                    }
                }
            }
        }

        FeatureMaps {
            maps,
            image_size,
            batch_size,
            data,
        }
    }

    /// Wraps column-major data, `maps * area` values per sample.
    ///
    /// # Returns
    ///
    /// - `Ok(FeatureMaps)` - The wrapped matrix
    /// - `Err(ModelError::InputValidationError)` - If the length is not a whole number of samples
    pub fn from_vec(maps: usize, image_size: Size, data: Vec<f32>) -> Result<Self, ModelError> {
        let rows = maps * image_size.area();
        if rows == 0 || data.len() % rows != 0 {
            return Err(ModelError::InputValidationError(format!(
                "{} values cannot be split into samples of {} maps of {}",
                data.len(),
                maps,
                image_size
            )));
        }

        Ok(FeatureMaps {
            maps,
            image_size,
            batch_size: data.len() / rows,
            data,
        })
    }

    /// Builds a matrix from an `ndarray` laid out as `(batch, maps * area)`.
    pub fn from_matrix(
        maps: usize,
        image_size: Size,
        matrix: &Array2<f32>,
    ) -> Result<Self, ModelError> {
        if matrix.ncols() != maps * image_size.area() {
            return Err(ModelError::InputValidationError(format!(
                "matrix has {} features per sample, expected {} maps of {}",
                matrix.ncols(),
                maps,
                image_size
            )));
        }
        FeatureMaps::from_vec(maps, image_size, matrix.iter().copied().collect())
    }

    /// Number of feature maps per sample.
    pub fn maps(&self) -> usize {
        self.maps
    }

    /// Size of every feature map.
    pub fn image_size(&self) -> Size {
        self.image_size
    }

    /// Number of samples (columns).
    pub fn batch_size(&self) -> usize {
        self.batch_size
    }

    /// Number of rows of the logical matrix, i.e. values per sample.
    pub fn rows(&self) -> usize {
        self.maps * self.image_size.area()
    }

    /// Offset of the first pixel of `map` inside a sample.
    pub fn map_offset(&self, map: usize) -> usize {
        map * self.image_size.area()
    }

    /// Raw column-major storage.
    pub fn as_slice(&self) -> &[f32] {
        &self.data
    }

    /// Mutable raw column-major storage.
    pub fn as_mut_slice(&mut self) -> &mut [f32] {
        &mut self.data
    }

    /// Copies one feature map of one sample into a 2D array.
    ///
    /// # Panics
    ///
    /// Panics if `sample` is not below `batch_size()` or `map` is not below `maps()`.
    pub fn image(&self, sample: usize, map: usize) -> Array2<f32> {
        self.assert_in_range(sample, map);
        let start = (sample * self.maps + map) * self.image_size.area();
        let pixels = &self.data[start..start + self.image_size.area()];
        let cols = self.image_size.cols;
        Array2::from_shape_fn((self.image_size.rows, cols), |(r, c)| pixels[r * cols + c])
    }

    /// Returns the matrix as a `(batch, maps * area)` array.
    pub fn to_matrix(&self) -> Array2<f32> {
        let rows = self.rows();
        Array2::from_shape_fn((self.batch_size, rows), |(b, i)| self.data[b * rows + i])
    }

    /// Sum of every pixel of `map` over all samples.
    ///
    /// # Panics
    ///
    /// Panics if `map` is not below `maps()`.
    pub fn map_sum(&self, map: usize) -> f32 {
        assert!(
            map < self.maps,
            "map index {} out of range for {} feature maps",
            map,
            self.maps
        );
        let area = self.image_size.area();
        (0..self.batch_size)
            .map(|b| {
                let start = (b * self.maps + map) * area;
                self.data[start..start + area].iter().sum::<f32>()
            })
            .sum()
    }

    /// Copies the `size` window at `origin` (row, col) of `map` out of every sample, sample
    /// after sample, each window row-major.
    ///
    /// The window must lie inside the image.
    pub(crate) fn window(&self, map: usize, origin: (usize, usize), size: Size) -> Vec<f32> {
        let area = self.image_size.area();
        let cols = self.image_size.cols;
        let mut out = Vec::with_capacity(size.area() * self.batch_size);
        for b in 0..self.batch_size {
            let image = &self.data[(b * self.maps + map) * area..][..area];
            for r in origin.0..origin.0 + size.rows {
                let row = r * cols + origin.1;
                out.extend_from_slice(&image[row..row + size.cols]);
            }
        }
        out
    }

    /// Reshapes to `maps` maps of `image_size` for `batch_size` samples and clears every value.
    ///
    /// Storage is reused when the total element count does not change.
    pub fn resize(&mut self, maps: usize, image_size: Size, batch_size: usize) {
        let len = maps * image_size.area() * batch_size;
        self.maps = maps;
        self.image_size = image_size;
        self.batch_size = batch_size;
        self.data.clear();
        self.data.resize(len, 0.0);
    }

    /// Multiplies every value by `factor`.
    pub fn scale(&mut self, factor: f32) {
        self.data.par_iter_mut().for_each(|v| *v *= factor);
    }

    /// Writes `value[map]` into every pixel of map `map` of every sample.
    pub fn broadcast_per_map(&mut self, values: &[f32]) {
        let area = self.image_size.area();
        let maps = self.maps;
        if area == 0 {
            return;
        }
        self.data
            .par_chunks_mut(area)
            .enumerate()
            .for_each(|(k, pixels)| pixels.fill(values[k % maps]));
    }

    fn assert_in_range(&self, sample: usize, map: usize) {
        assert!(
            sample < self.batch_size && map < self.maps,
            "image ({}, {}) out of range for {} samples of {} feature maps",
            sample,
            map,
            self.batch_size,
            self.maps
        );
    }
}
