//! # OpenCL Vector-Add Executor
//!
//! This module provides the `VectorAddExecutor`, which owns everything needed to
//! run the `simple_add` kernel on one device: the context, an in-order command
//! queue, the compiled kernel and three device buffers sized for a fixed
//! element count.
//!
//! A run is the classic call sequence:
//! 1.  **Discovery**: pick a platform and a device by index (first by default).
//! 2.  **Build**: compile `KERNEL_SOURCE` for the device; a failed build surfaces
//!     the compiler log.
//! 3.  **Upload**: blocking writes of A and B.
//! 4.  **Launch**: one kernel enqueue over `global_size` work-items.
//! 5.  **Read-back**: blocking read of C, which also waits for the kernel.
//!
//! Only compiled with the `opencl` feature, since it links the system ICD loader.

#![cfg(feature = "opencl")]

use anyhow::{Context as _, Result};
use opencl3::command_queue::{CommandQueue, CL_QUEUE_PROFILING_ENABLE};
use opencl3::context::Context;
use opencl3::device::{
    Device, CL_DEVICE_TYPE_ACCELERATOR, CL_DEVICE_TYPE_ALL, CL_DEVICE_TYPE_CPU,
    CL_DEVICE_TYPE_GPU,
};
use opencl3::error_codes::ClError;
use opencl3::event::Event;
use opencl3::kernel::{ExecuteKernel, Kernel};
use opencl3::memory::{Buffer, CL_MEM_READ_ONLY, CL_MEM_WRITE_ONLY};
use opencl3::platform::{get_platforms, Platform};
use opencl3::program::Program;
use opencl3::types::{cl_device_id, cl_device_type, cl_int, cl_mem_flags, CL_BLOCKING};
use std::ptr;
use std::time::Instant;
use tracing::{debug, info};

use crate::error::VectorAddError;
use crate::kernel::{BUILD_OPTIONS, KERNEL_NAME, KERNEL_SOURCE};
use crate::model::{DeviceInfo, DeviceKind, PlatformInfo, RunConfig, ELEMENT_BYTES};
use crate::report::RunReport;
use crate::verify::verify;
use crate::workload::{cpu_baseline, HostVectors};

// CL_DEVICE_TYPE_CUSTOM (OpenCL 1.2)
const CL_DEVICE_TYPE_CUSTOM: cl_device_type = 1 << 4;

// Status codes the ICD loader returns instead of an empty list
const CL_DEVICE_NOT_FOUND: cl_int = -1;
const CL_PLATFORM_NOT_FOUND_KHR: cl_int = -1001;

/// Host-side timings and output of one upload/launch/read-back sequence.
#[derive(Debug, Clone)]
pub struct DeviceRun {
    pub result: Vec<i32>,
    pub upload_us: u64,
    pub kernel_us: u64,
    pub kernel_profiled_us: Option<f64>,
    pub read_back_us: u64,
}

/// Runs the vector-add kernel on one OpenCL device.
///
/// Buffers are allocated once in `new` for `count` elements and reused by every
/// upload and launch.
pub struct VectorAddExecutor {
    platform_name: String,
    device_info: DeviceInfo,
    _context: Context,
    queue: CommandQueue,
    _program: Program,
    kernel: Kernel,

    a: Buffer<cl_int>,
    b: Buffer<cl_int>,
    c: Buffer<cl_int>,
    count: usize,

    /// Whether the queue was created with profiling enabled
    pub profiling_enabled: bool,
    last_kernel_event: Option<Event>,

    // Statistics
    /// Total kernel enqueues
    pub total_launches: u64,
    /// Bytes copied host-to-device
    pub bytes_uploaded: u64,
    /// Bytes copied device-to-host
    pub bytes_downloaded: u64,
}

impl VectorAddExecutor {
    /// Selects the device named by `config`, builds the kernel and allocates buffers.
    pub fn new(config: &RunConfig) -> Result<Self> {
        config.validate()?;

        let platform = select_platform(config.platform_index)?;
        let platform_name = platform.name().context("Failed to query platform name")?;
        info!("[VECADD:CL] Using platform: {}", platform_name);

        let device = select_device(
            &platform,
            &platform_name,
            config.device_kind,
            config.device_index,
        )?;
        let device_info = describe_device(&device, config.device_index)?;
        info!("[VECADD:CL] Using device: {}", device_info.name);

        let context = Context::from_device(&device).context("Failed to create OpenCL context")?;

        let program =
            Program::create_and_build_from_source(&context, KERNEL_SOURCE, BUILD_OPTIONS)
                .map_err(|log| VectorAddError::Build { log })?;
        let kernel = Kernel::create(&program, KERNEL_NAME)
            .with_context(|| format!("Failed to create kernel '{}'", KERNEL_NAME))?;
        debug!("[VECADD:CL] Built kernel '{}'", KERNEL_NAME);

        let properties = if config.profiling {
            CL_QUEUE_PROFILING_ENABLE
        } else {
            0
        };
        #[allow(deprecated)]
        let queue = CommandQueue::create_default(&context, properties)
            .context("Failed to create command queue")?;

        let count = config.count;
        let a = alloc_buffer(&context, CL_MEM_READ_ONLY, count)
            .context("Failed to allocate buffer A")?;
        let b = alloc_buffer(&context, CL_MEM_READ_ONLY, count)
            .context("Failed to allocate buffer B")?;
        let c = alloc_buffer(&context, CL_MEM_WRITE_ONLY, count)
            .context("Failed to allocate buffer C")?;
        debug!(
            "[VECADD:CL] Allocated 3 buffers of {} bytes",
            count * ELEMENT_BYTES
        );

        Ok(Self {
            platform_name,
            device_info,
            _context: context,
            queue,
            _program: program,
            kernel,
            a,
            b,
            c,
            count,
            profiling_enabled: config.profiling,
            last_kernel_event: None,
            total_launches: 0,
            bytes_uploaded: 0,
            bytes_downloaded: 0,
        })
    }

    pub fn platform_name(&self) -> &str {
        &self.platform_name
    }

    pub fn device_info(&self) -> &DeviceInfo {
        &self.device_info
    }

    /// Element count the buffers were allocated for
    pub fn count(&self) -> usize {
        self.count
    }

    /// Copies both inputs into the device buffers with blocking writes.
    ///
    /// Returns the elapsed wall time in microseconds.
    pub fn upload(&mut self, inputs: &HostVectors) -> Result<u64> {
        inputs.ensure_len(self.count)?;

        let start = Instant::now();
        unsafe {
            self.queue
                .enqueue_write_buffer(&mut self.a, CL_BLOCKING, 0, inputs.a(), &[])
                .context("Failed to write buffer A")?;
            self.queue
                .enqueue_write_buffer(&mut self.b, CL_BLOCKING, 0, inputs.b(), &[])
                .context("Failed to write buffer B")?;
        }
        let elapsed_us = start.elapsed().as_micros() as u64;

        let (a_bytes, b_bytes) = inputs.as_bytes();
        self.bytes_uploaded += (a_bytes.len() + b_bytes.len()) as u64;
        debug!("[VECADD:CL] Uploaded A and B in {} us", elapsed_us);

        Ok(elapsed_us)
    }

    /// Enqueues one kernel invocation over `global_size` work-items.
    ///
    /// The launch is not waited on; the blocking read in `read_back` completes it.
    /// Returns the enqueue wall time in microseconds.
    pub fn launch(&mut self, global_size: usize) -> Result<u64> {
        if global_size == 0 || global_size > self.count {
            return Err(VectorAddError::InvalidConfig(format!(
                "global work size {} outside 1..={}",
                global_size, self.count
            ))
            .into());
        }

        let start = Instant::now();
        let event = unsafe {
            ExecuteKernel::new(&self.kernel)
                .set_arg(&self.a)
                .set_arg(&self.b)
                .set_arg(&self.c)
                .set_global_work_size(global_size)
                .enqueue_nd_range(&self.queue)
                .context("Failed to enqueue kernel")?
        };
        let elapsed_us = start.elapsed().as_micros() as u64;

        self.last_kernel_event = Some(event);
        self.total_launches += 1;
        debug!(
            "[VECADD:CL] Enqueued kernel over {} work-items in {} us",
            global_size, elapsed_us
        );

        Ok(elapsed_us)
    }

    /// Copies C back to a fresh host vector with a blocking read.
    ///
    /// Returns the vector and the elapsed wall time in microseconds.
    pub fn read_back(&mut self) -> Result<(Vec<i32>, u64)> {
        let mut out: Vec<cl_int> = vec![0; self.count];

        let start = Instant::now();
        unsafe {
            self.queue
                .enqueue_read_buffer(&self.c, CL_BLOCKING, 0, out.as_mut_slice(), &[])
                .context("Failed to read buffer C")?;
        }
        let elapsed_us = start.elapsed().as_micros() as u64;

        self.bytes_downloaded += (self.count * ELEMENT_BYTES) as u64;
        debug!("[VECADD:CL] Read back C in {} us", elapsed_us);

        Ok((out, elapsed_us))
    }

    /// Kernel execution time of the last launch from its profiling event.
    ///
    /// `None` when profiling is disabled or nothing has been launched yet. The
    /// event must have completed, which is guaranteed after `read_back`.
    pub fn kernel_profiled_us(&self) -> Result<Option<f64>> {
        if !self.profiling_enabled {
            return Ok(None);
        }
        match &self.last_kernel_event {
            Some(event) => {
                let start = event
                    .profiling_command_start()
                    .context("Failed to read kernel start time")?;
                let end = event
                    .profiling_command_end()
                    .context("Failed to read kernel end time")?;
                Ok(Some(end.saturating_sub(start) as f64 / 1000.0))
            }
            None => Ok(None),
        }
    }

    /// Upload, launch and read back in one call.
    pub fn run(&mut self, inputs: &HostVectors, global_size: usize) -> Result<DeviceRun> {
        let upload_us = self.upload(inputs)?;
        let kernel_us = self.launch(global_size)?;
        let (result, read_back_us) = self.read_back()?;
        let kernel_profiled_us = self.kernel_profiled_us()?;

        Ok(DeviceRun {
            result,
            upload_us,
            kernel_us,
            kernel_profiled_us,
            read_back_us,
        })
    }

    /// Blocks until every command on the queue has completed.
    pub fn synchronize(&self) -> Result<()> {
        self.queue.finish().context("Failed to finish command queue")?;
        Ok(())
    }

    /// Get statistics
    pub fn get_stats(&self) -> (u64, u64, u64) {
        (self.total_launches, self.bytes_uploaded, self.bytes_downloaded)
    }

    /// Reset statistics
    pub fn reset_stats(&mut self) {
        self.total_launches = 0;
        self.bytes_uploaded = 0;
        self.bytes_downloaded = 0;
        self.last_kernel_event = None;
    }
}

/// Runs the full demo described by `config` and returns its report.
///
/// The CPU loop runs between kernel enqueue and read-back, so the device works
/// while the host computes its own sum.
pub fn run_vector_add(config: &RunConfig) -> Result<RunReport> {
    let mut executor = VectorAddExecutor::new(config)?;
    let inputs = HostVectors::generate(config.count);
    let global_size = config.effective_global_size();

    let upload_us = executor.upload(&inputs)?;
    let kernel_us = executor.launch(global_size)?;

    let baseline = cpu_baseline(&inputs)?;
    info!(
        "[VECADD:CPU] No OpenCL: time elapsed: {} microseconds",
        baseline.elapsed_us
    );

    let (result, read_back_us) = executor.read_back()?;
    info!(
        "[VECADD:CL] OpenCL: time elapsed: {} microseconds",
        read_back_us
    );
    let kernel_profiled_us = executor.kernel_profiled_us()?;

    let verification = if config.verify {
        let v = verify(&baseline.result, &result, 0..global_size)?;
        if v.passed() {
            info!("[VECADD:VERIFY] {} elements match", v.checked);
        } else {
            tracing::warn!(
                "[VECADD:VERIFY] {} of {} elements differ",
                v.mismatches,
                v.checked
            );
        }
        Some(v)
    } else {
        None
    };

    let (_, bytes_uploaded, bytes_downloaded) = executor.get_stats();

    Ok(RunReport {
        config: config.clone(),
        platform: executor.platform_name().to_string(),
        device: executor.device_info().name.clone(),
        cpu_us: baseline.elapsed_us as u64,
        upload_us,
        kernel_us,
        kernel_profiled_us,
        read_back_us,
        bytes_uploaded,
        bytes_downloaded,
        verification,
    })
}

/// Enumerates every platform and all of its devices.
pub fn list_platforms() -> Result<Vec<PlatformInfo>> {
    let mut platforms = Vec::new();

    for (index, platform) in available_platforms()?.iter().enumerate() {
        let mut devices = Vec::new();
        let ids = device_ids(platform, DeviceKind::All)?;
        for (device_index, id) in ids.into_iter().enumerate() {
            devices.push(describe_device(&Device::new(id), device_index)?);
        }

        platforms.push(PlatformInfo {
            index,
            name: platform.name()?,
            vendor: platform.vendor()?,
            version: platform.version()?,
            devices,
        });
    }

    Ok(platforms)
}

fn available_platforms() -> Result<Vec<Platform>> {
    match get_platforms() {
        Ok(platforms) => Ok(platforms),
        Err(ClError(code)) if code == CL_PLATFORM_NOT_FOUND_KHR => Ok(Vec::new()),
        Err(e) => Err(VectorAddError::from(e).into()),
    }
}

fn select_platform(index: usize) -> Result<Platform> {
    let platforms = available_platforms()?;
    if platforms.is_empty() {
        return Err(VectorAddError::NoPlatform.into());
    }
    let available = platforms.len();
    platforms
        .into_iter()
        .nth(index)
        .ok_or_else(|| VectorAddError::PlatformIndex { index, available }.into())
}

fn device_ids(platform: &Platform, kind: DeviceKind) -> Result<Vec<cl_device_id>> {
    match platform.get_devices(device_type_bits(kind)) {
        Ok(ids) => Ok(ids),
        Err(ClError(code)) if code == CL_DEVICE_NOT_FOUND => Ok(Vec::new()),
        Err(e) => Err(VectorAddError::from(e).into()),
    }
}

fn select_device(
    platform: &Platform,
    platform_name: &str,
    kind: DeviceKind,
    index: usize,
) -> Result<Device> {
    let ids = device_ids(platform, kind)?;
    if ids.is_empty() {
        return Err(VectorAddError::NoDevice {
            platform: platform_name.to_string(),
        }
        .into());
    }
    let available = ids.len();
    let id = ids
        .get(index)
        .copied()
        .ok_or(VectorAddError::DeviceIndex { index, available })?;
    Ok(Device::new(id))
}

fn describe_device(device: &Device, index: usize) -> Result<DeviceInfo> {
    Ok(DeviceInfo {
        index,
        name: device.name()?,
        vendor: device.vendor()?,
        version: device.version()?,
        kind: kind_from_type_bits(device.dev_type()?),
        compute_units: device.max_compute_units()?,
        global_mem_bytes: device.global_mem_size()?,
        max_work_group_size: device.max_work_group_size()?,
    })
}

fn alloc_buffer(
    context: &Context,
    flags: cl_mem_flags,
    count: usize,
) -> Result<Buffer<cl_int>> {
    let buffer = unsafe { Buffer::<cl_int>::create(context, flags, count, ptr::null_mut())? };
    Ok(buffer)
}

fn device_type_bits(kind: DeviceKind) -> cl_device_type {
    match kind {
        DeviceKind::All => CL_DEVICE_TYPE_ALL,
        DeviceKind::Gpu => CL_DEVICE_TYPE_GPU,
        DeviceKind::Cpu => CL_DEVICE_TYPE_CPU,
        DeviceKind::Accelerator => CL_DEVICE_TYPE_ACCELERATOR,
        DeviceKind::Custom => CL_DEVICE_TYPE_CUSTOM,
    }
}

fn kind_from_type_bits(bits: cl_device_type) -> DeviceKind {
    if bits & CL_DEVICE_TYPE_GPU != 0 {
        DeviceKind::Gpu
    } else if bits & CL_DEVICE_TYPE_ACCELERATOR != 0 {
        DeviceKind::Accelerator
    } else if bits & CL_DEVICE_TYPE_CPU != 0 {
        DeviceKind::Cpu
    } else {
        DeviceKind::Custom
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_device_type_bits_round_trip() {
        for kind in [
            DeviceKind::Gpu,
            DeviceKind::Cpu,
            DeviceKind::Accelerator,
            DeviceKind::Custom,
        ] {
            assert_eq!(kind_from_type_bits(device_type_bits(kind)), kind);
        }
        assert_eq!(device_type_bits(DeviceKind::All), CL_DEVICE_TYPE_ALL);
    }

    #[test]
    fn test_gpu_bit_wins_over_default_bit() {
        // Drivers commonly report GPU | DEFAULT
        let bits = CL_DEVICE_TYPE_GPU | opencl3::device::CL_DEVICE_TYPE_DEFAULT;
        assert_eq!(kind_from_type_bits(bits), DeviceKind::Gpu);
    }

    #[test]
    fn test_unrecognised_type_bits_are_custom() {
        let default_only = opencl3::device::CL_DEVICE_TYPE_DEFAULT;
        assert_eq!(kind_from_type_bits(default_only), DeviceKind::Custom);
        assert_eq!(kind_from_type_bits(CL_DEVICE_TYPE_CUSTOM), DeviceKind::Custom);
        assert_ne!(kind_from_type_bits(0), DeviceKind::All);
    }

    #[test]
    #[ignore = "requires an OpenCL runtime"]
    fn test_small_run_matches_cpu() {
        let config = RunConfig::with_count(4096);
        let report = run_vector_add(&config).unwrap();

        let v = report.verification.as_ref().unwrap();
        assert!(v.passed(), "{}", report);
        assert_eq!(v.checked, 4096);
        assert_eq!(report.bytes_uploaded, 2 * 4096 * 4);
        assert_eq!(report.bytes_downloaded, 4096 * 4);
    }

    #[test]
    #[ignore = "requires an OpenCL runtime"]
    fn test_partial_launch_leaves_tail_unchecked() {
        let config = RunConfig::with_count(1_000_000).with_global_size(1000);
        let report = run_vector_add(&config).unwrap();

        let v = report.verification.unwrap();
        assert!(v.passed());
        assert_eq!(v.checked, 1000);
        assert_eq!(v.unchecked, 999_000);
    }

    #[test]
    #[ignore = "requires an OpenCL runtime"]
    fn test_executor_reuses_buffers() {
        let config = RunConfig {
            profiling: true,
            ..RunConfig::with_count(256)
        };
        let mut executor = VectorAddExecutor::new(&config).unwrap();

        let first = executor.run(&HostVectors::generate(256), 256).unwrap();
        assert_eq!(first.result[255], 511);
        assert!(first.kernel_profiled_us.is_some());

        let inputs = HostVectors::from_parts(vec![7; 256], vec![-7; 256]).unwrap();
        let second = executor.run(&inputs, 256).unwrap();
        assert!(second.result.iter().all(|&x| x == 0));

        assert_eq!(executor.get_stats().0, 2);
        executor.reset_stats();
        assert_eq!(executor.get_stats(), (0, 0, 0));
    }

    #[test]
    #[ignore = "requires an OpenCL runtime"]
    fn test_upload_rejects_wrong_length() {
        let mut executor = VectorAddExecutor::new(&RunConfig::with_count(64)).unwrap();
        let err = executor.upload(&HostVectors::generate(32)).unwrap_err();
        assert!(matches!(
            err.downcast_ref::<VectorAddError>(),
            Some(VectorAddError::LengthMismatch {
                expected: 64,
                actual: 32
            })
        ));
        assert!(executor.launch(65).is_err());
    }

    #[test]
    #[ignore = "requires an OpenCL runtime"]
    fn test_upload_rejects_inputs_for_other_count() {
        let mut executor = VectorAddExecutor::new(&RunConfig::with_count(64)).unwrap();
        let inputs = HostVectors::from_parts(vec![1; 65], vec![2; 65]).unwrap();
        let err = executor.upload(&inputs).unwrap_err();
        assert!(matches!(
            err.downcast_ref::<VectorAddError>(),
            Some(VectorAddError::LengthMismatch {
                expected: 64,
                actual: 65
            })
        ));
        assert_eq!(executor.get_stats().1, 0);
    }

    #[test]
    fn test_run_rejects_invalid_config_before_discovery() {
        let err = run_vector_add(&RunConfig::with_count(0)).unwrap_err();
        assert!(matches!(
            err.downcast_ref::<VectorAddError>(),
            Some(VectorAddError::InvalidConfig(_))
        ));
    }

    #[test]
    fn test_out_of_range_platform_is_an_error() {
        let config = RunConfig::default().with_device(usize::MAX, 0);
        let err = VectorAddExecutor::new(&config).err().unwrap();
        assert!(matches!(
            err.downcast_ref::<VectorAddError>(),
            Some(VectorAddError::NoPlatform) | Some(VectorAddError::PlatformIndex { .. })
        ));
    }
}
