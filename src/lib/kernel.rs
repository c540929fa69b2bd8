//! OpenCL C source for the vector-add kernel.
//!
//! Each work-item handles exactly one element: `C[i] = A[i] + B[i]` with
//! `i = get_global_id(0)`. The program is compiled at runtime for the selected
//! device, so this string is the only device code in the crate.

/// Entry point name inside `KERNEL_SOURCE`.
pub const KERNEL_NAME: &str = "simple_add";

/// Kernel program compiled for the selected device.
pub const KERNEL_SOURCE: &str = r#"
kernel void simple_add(global const int* A, global const int* B, global int* C)
{
    C[get_global_id(0)] = A[get_global_id(0)] + B[get_global_id(0)];
}
"#;

/// Compiler options passed to the program build.
pub const BUILD_OPTIONS: &str = "";

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_source_declares_entry_point() {
        assert!(KERNEL_SOURCE.contains(&format!("kernel void {}(", KERNEL_NAME)));
    }

    #[test]
    fn test_kernel_takes_three_int_buffers() {
        assert_eq!(KERNEL_SOURCE.matches("global const int*").count(), 2);
        assert_eq!(KERNEL_SOURCE.matches("global int*").count(), 1);
    }
}
