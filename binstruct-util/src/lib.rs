//! Small, domain-agnostic helpers shared by the compiler and VM crates.

/// Create a fixed-size byte array from a byte slice.
///
/// # Panics
///
/// This function will panic if the given slice is not of length `N`.
pub fn array_from_slice<const N: usize>(slice: &[u8]) -> [u8; N] {
    let mut arr = [0; N];
    arr.copy_from_slice(slice);
    arr
}

/// Render a byte slice as a lowercase hex string, with no separators.
pub fn to_lower_hex(bytes: &[u8]) -> String {
    use std::fmt::Write;
    let mut s = String::with_capacity(bytes.len() * 2);
    for b in bytes {
        write!(&mut s, "{b:02x}").expect("writing to a String cannot fail");
    }
    s
}
