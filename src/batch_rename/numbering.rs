//! Rendering of sequence numbers and conflict suffixes.

/// Start value and zero-padding for generated numbers.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct NumberingConfig {
    pub start: u64,
    /// Minimum digit count. Zero disables padding.
    pub padding_width: usize,
}

impl NumberingConfig {
    #[must_use]
    pub const fn new(start: u64, padding_width: usize) -> Self {
        Self { start, padding_width }
    }

    /// Render a number with this config's padding.
    #[must_use]
    pub fn render(&self, number: u64) -> String {
        render(number, self.padding_width)
    }
}

/// Left-pad `number` with zeros to `padding_width` digits.
///
/// Numbers wider than the padding are never truncated.
///
/// ```rust
/// use rx_rename::batch_rename::render;
///
/// assert_eq!(render(5, 2), "05");
/// assert_eq!(render(123, 2), "123");
/// assert_eq!(render(7, 0), "7");
/// ```
#[must_use]
pub fn render(number: u64, padding_width: usize) -> String {
    if padding_width > 0 {
        format!("{number:0padding_width$}")
    } else {
        number.to_string()
    }
}
