use bytemuck::Pod;

/// Fixed size, flat buffer of elements with optional 2D addressing.
///
/// 1D resources have stride 0 and no 2D addressing, 2D resources are stored row by row with stride equal to
/// the row length. Element `(x, y)` aliases element `y * stride + x`.
/// Indexing outside of the resource is a bug in the caller and panics.
#[derive(Clone, Debug, PartialEq)]
pub struct Resource<T> {
    data: Vec<T>,
    stride: usize,
}

impl<T: Copy + Default> Resource<T> {
    pub fn new(size: usize) -> Self {
        Resource {
            data: vec![T::default(); size],
            stride: 0,
        }
    }

    pub fn new_2d(x_size: usize, y_size: usize) -> Self {
        Resource {
            data: vec![T::default(); x_size * y_size],
            stride: x_size,
        }
    }
}

impl<T> Resource<T> {
    /// Wraps existing data as a 1D resource.
    pub fn from_vec(data: Vec<T>) -> Self {
        Resource { data, stride: 0 }
    }

    pub fn get_data(&self) -> &[T] {
        &self.data
    }

    pub fn get(&self, index: usize) -> Option<&T> {
        self.data.get(index)
    }

    pub fn get_mut(&mut self, index: usize) -> Option<&mut T> {
        self.data.get_mut(index)
    }

    pub fn item(&self, index: usize) -> &T {
        let len = self.data.len();
        self.data
            .get(index)
            .unwrap_or_else(|| panic!("resource index {index} out of bounds (length {len})"))
    }

    pub fn item_mut(&mut self, index: usize) -> &mut T {
        let len = self.data.len();
        self.data
            .get_mut(index)
            .unwrap_or_else(|| panic!("resource index {index} out of bounds (length {len})"))
    }

    pub fn item_at(&self, x: usize, y: usize) -> &T {
        let index = self.index_2d(x, y);
        self.item(index)
    }

    pub fn item_at_mut(&mut self, x: usize, y: usize) -> &mut T {
        let index = self.index_2d(x, y);
        self.item_mut(index)
    }

    pub fn get_size_in_bytes(&self) -> usize {
        self.data.len() * std::mem::size_of::<T>()
    }

    pub fn get_number_of_elements(&self) -> usize {
        self.data.len()
    }

    pub fn get_stride(&self) -> usize {
        self.stride
    }

    /// Row length of a 2D resource, element count of a 1D one.
    pub fn width(&self) -> usize {
        if self.stride == 0 {
            self.data.len()
        } else {
            self.stride
        }
    }

    pub fn height(&self) -> usize {
        if self.stride == 0 {
            1
        } else {
            self.data.len() / self.stride
        }
    }

    pub fn iter(&self) -> std::slice::Iter<'_, T> {
        self.data.iter()
    }

    fn index_2d(&self, x: usize, y: usize) -> usize {
        debug_assert!(self.stride != 0, "2D access to a resource without a row stride");
        if self.stride != 0 && x >= self.stride {
            panic!("resource column {x} out of bounds (row length {})", self.stride);
        }
        y * self.stride + x
    }
}

impl<T: Clone> Resource<T> {
    pub fn fill(&mut self, value: T) {
        self.data.fill(value);
    }
}

impl<T: Pod> Resource<T> {
    /// Contiguous byte view, as uploaded to GPU memory or written to image files.
    pub fn as_bytes(&self) -> &[u8] {
        bytemuck::cast_slice(&self.data)
    }
}
