//! End-to-end scenarios against a real loopback `venus_server`, exercising
//! `venus_driver` the way an application actually would: no mocked
//! transport, no reaching into crate internals.

use std::net::SocketAddr;
use std::sync::Arc;
use std::thread::{self, JoinHandle};

use venus_driver::resource::MappedRange;
use venus_driver::sync::SubmitBatch;
use venus_driver::Driver;
use venus_registry::CommandBufferState;
use venus_server::Server;
use venus_wire::commands::lifecycle::BufferCopyRegion;

const BUFFER_USAGE_TRANSFER_SRC: u32 = 0x0000_0001;
const BUFFER_USAGE_TRANSFER_DST: u32 = 0x0000_0002;
const SHARING_MODE_EXCLUSIVE: u32 = 0;
const MEMORY_TYPE_HOST_VISIBLE_COHERENT: u32 = 1;

/// Binds a fresh server, serves exactly one connection on a background
/// thread until that connection's peer disconnects, and returns a driver
/// already connected to it.
fn connected_driver() -> (Driver, SocketAddr, Arc<Server>, JoinHandle<()>) {
    let server = Arc::new(Server::bind("127.0.0.1:0").expect("bind"));
    let addr = server.local_addr().expect("local_addr");
    let server_clone = server.clone();
    let handle = thread::spawn(move || {
        server_clone.accept_one().expect("accept_one");
    });
    let driver = Driver::connect(addr).expect("connect");
    (driver, addr, server, handle)
}

#[test]
fn version_handshake_reports_the_fixed_registry_version() {
    let (driver, _addr, _server, handle) = connected_driver();
    let version = driver.enumerate_instance_version().expect("enumerate_instance_version");
    assert_eq!(version, venus_wire::VULKAN_XML_REGISTRY_VERSION);
    drop(driver);
    handle.join().unwrap();
}

#[test]
fn instance_and_physical_device_enumeration_finds_the_fixed_gpu() {
    let (driver, _addr, _server, handle) = connected_driver();

    let instance = driver.create_instance("scenario-2", &[]).expect("create_instance");
    let physical_devices = driver.enumerate_physical_devices(instance).expect("enumerate_physical_devices");
    assert_eq!(physical_devices.len(), 1);

    let props = driver
        .get_physical_device_properties(physical_devices[0])
        .expect("get_physical_device_properties");
    assert_eq!(props.device_name, "Venus Plus Virtual GPU");

    let memory_props = driver
        .get_physical_device_memory_properties(physical_devices[0])
        .expect("get_physical_device_memory_properties");
    assert_eq!(memory_props.memory_heaps.len(), 2);

    driver.destroy_instance(instance).expect("destroy_instance");
    drop(driver);
    handle.join().unwrap();
}

#[test]
fn binding_and_freeing_memory_cascades_through_the_resource_cross_index() {
    let (driver, _addr, _server, handle) = connected_driver();

    let instance = driver.create_instance("scenario-3", &[]).expect("create_instance");
    let physical_devices = driver.enumerate_physical_devices(instance).expect("enumerate_physical_devices");
    let device = driver.create_device(physical_devices[0], &[], &[]).expect("create_device");

    let buffer = driver
        .create_buffer(device, 1 << 20, BUFFER_USAGE_TRANSFER_SRC | BUFFER_USAGE_TRANSFER_DST, SHARING_MODE_EXCLUSIVE)
        .expect("create_buffer");
    let memory = driver
        .allocate_memory(device, 1 << 20, MEMORY_TYPE_HOST_VISIBLE_COHERENT)
        .expect("allocate_memory");

    driver.bind_buffer_memory(device, buffer, memory, 0).expect("bind_buffer_memory");
    assert_eq!(
        driver.memory_bound_resources(memory).expect("memory_bound_resources"),
        vec![venus_registry::BoundResource::Buffer(buffer)]
    );

    driver.free_memory(device, memory).expect("free_memory");
    assert!(driver.buffer_binding(buffer).expect("buffer_binding").is_none());

    drop(driver);
    handle.join().unwrap();
}

#[test]
fn repeating_a_descriptor_bind_is_accepted_without_error() {
    let (driver, _addr, _server, handle) = connected_driver();

    let instance = driver.create_instance("scenario-4", &[]).expect("create_instance");
    let physical_devices = driver.enumerate_physical_devices(instance).expect("enumerate_physical_devices");
    let device = driver.create_device(physical_devices[0], &[], &[]).expect("create_device");
    let pool = driver.create_command_pool(device, 0, 0).expect("create_command_pool");
    let buffers = driver.allocate_command_buffers(device, pool, 0, 1).expect("allocate_command_buffers");
    let cb = buffers[0];
    driver.begin_command_buffer(cb, 0).expect("begin_command_buffer");

    let sets = [venus_wire::ServerIdentity(7), venus_wire::ServerIdentity(8)];
    let layout = venus_wire::ServerIdentity(9);
    // First bind actually changes state and is sent; the repeat is elided
    // by the lifecycle tracker's dirty cache (exercised directly in
    // venus_registry's own unit tests) but still reports success here.
    driver.cmd_bind_descriptor_sets(cb, 0, layout, 0, &sets, &[]).expect("first bind");
    driver.cmd_bind_descriptor_sets(cb, 0, layout, 0, &sets, &[]).expect("identical repeat bind");

    driver.end_command_buffer(cb).expect("end_command_buffer");
    drop(driver);
    handle.join().unwrap();
}

#[test]
fn a_buffer_copy_submitted_on_the_queue_moves_host_written_bytes() {
    let (driver, _addr, _server, handle) = connected_driver();

    let instance = driver.create_instance("scenario-5", &[]).expect("create_instance");
    let physical_devices = driver.enumerate_physical_devices(instance).expect("enumerate_physical_devices");
    let device = driver.create_device(physical_devices[0], &[], &[]).expect("create_device");
    let queue = driver.get_device_queue(device, 0, 0).expect("get_device_queue");

    const SIZE: u64 = 1 << 20;
    let src_buffer = driver
        .create_buffer(device, SIZE, BUFFER_USAGE_TRANSFER_SRC, SHARING_MODE_EXCLUSIVE)
        .expect("create src buffer");
    let src_memory = driver
        .allocate_memory(device, SIZE, MEMORY_TYPE_HOST_VISIBLE_COHERENT)
        .expect("allocate src memory");
    driver.bind_buffer_memory(device, src_buffer, src_memory, 0).expect("bind src buffer");

    let dst_buffer = driver
        .create_buffer(device, SIZE, BUFFER_USAGE_TRANSFER_DST, SHARING_MODE_EXCLUSIVE)
        .expect("create dst buffer");
    let dst_memory = driver
        .allocate_memory(device, SIZE, MEMORY_TYPE_HOST_VISIBLE_COHERENT)
        .expect("allocate dst memory");
    driver.bind_buffer_memory(device, dst_buffer, dst_memory, 0).expect("bind dst buffer");

    let mut pattern = Vec::with_capacity(SIZE as usize);
    while (pattern.len() as u64) < SIZE {
        pattern.extend_from_slice(&0x1234_5678u32.to_le_bytes());
    }
    assert_eq!(pattern.len() as u64, SIZE);

    driver.map_memory(device, src_memory, 0, SIZE).expect("map src memory");
    driver.write_mapped_memory(src_memory, 0, &pattern).expect("write_mapped_memory");
    driver
        .flush_mapped_memory_ranges(device, &[MappedRange { memory: src_memory, offset: 0, size: SIZE }])
        .expect("flush_mapped_memory_ranges");
    driver.unmap_memory(device, src_memory).expect("unmap src memory");

    let pool = driver.create_command_pool(device, 0, 0).expect("create_command_pool");
    let buffers = driver.allocate_command_buffers(device, pool, 0, 1).expect("allocate_command_buffers");
    let cb = buffers[0];
    driver.begin_command_buffer(cb, 0).expect("begin_command_buffer");
    driver
        .cmd_copy_buffer(
            cb,
            src_buffer,
            dst_buffer,
            vec![BufferCopyRegion { src_offset: 0, dst_offset: 0, size: SIZE }],
        )
        .expect("cmd_copy_buffer src->dst");
    driver.cmd_fill_buffer(cb, src_buffer, 0, SIZE, 0).expect("cmd_fill_buffer src=0");
    driver
        .cmd_copy_buffer(
            cb,
            dst_buffer,
            src_buffer,
            vec![BufferCopyRegion { src_offset: 0, dst_offset: 0, size: SIZE }],
        )
        .expect("cmd_copy_buffer dst->src");
    driver.end_command_buffer(cb).expect("end_command_buffer");
    assert_eq!(driver.command_buffer_state(cb).unwrap(), CommandBufferState::Executable);

    let fence = driver.create_fence(device, false).expect("create_fence");
    driver
        .queue_submit(
            queue,
            vec![SubmitBatch {
                wait_semaphores: vec![],
                wait_values: vec![],
                wait_stage_masks: vec![],
                command_buffers: vec![cb],
                signal_semaphores: vec![],
                signal_values: vec![],
            }],
            Some(fence),
        )
        .expect("queue_submit");
    driver.wait_for_fences(device, &[fence], true, u64::MAX).expect("wait_for_fences");

    driver.map_memory(device, src_memory, 0, SIZE).expect("remap src memory");
    let read_back = driver.read_mapped_memory(src_memory, 0, SIZE).expect("read_mapped_memory");
    assert_eq!(read_back, pattern);

    drop(driver);
    handle.join().unwrap();
}

#[test]
fn closing_the_transport_after_execution_declares_the_device_lost() {
    let (driver, _addr, _server, handle) = connected_driver();

    let instance = driver.create_instance("scenario-6", &[]).expect("create_instance");
    let physical_devices = driver.enumerate_physical_devices(instance).expect("enumerate_physical_devices");
    let device = driver.create_device(physical_devices[0], &[], &[]).expect("create_device");
    let queue = driver.get_device_queue(device, 0, 0).expect("get_device_queue");
    let fence = driver.create_fence(device, false).expect("create_fence");

    let pool = driver.create_command_pool(device, 0, 0).expect("create_command_pool");
    let buffers = driver.allocate_command_buffers(device, pool, 0, 1).expect("allocate_command_buffers");
    let cb = buffers[0];
    driver.begin_command_buffer(cb, 0).expect("begin_command_buffer");
    driver.end_command_buffer(cb).expect("end_command_buffer");
    assert_eq!(driver.command_buffer_state(cb).unwrap(), CommandBufferState::Executable);

    driver.disconnect().expect("disconnect");

    let submit_err = driver
        .queue_submit(
            queue,
            vec![SubmitBatch {
                wait_semaphores: vec![],
                wait_values: vec![],
                wait_stage_masks: vec![],
                command_buffers: vec![cb],
                signal_semaphores: vec![],
                signal_values: vec![],
            }],
            None,
        )
        .expect_err("queue_submit must fail once the transport is closed");
    assert!(submit_err.is_device_lost());
    assert_eq!(driver.command_buffer_state(cb).unwrap(), CommandBufferState::Invalid);

    let wait_err = driver
        .wait_for_fences(device, &[fence], true, u64::MAX)
        .expect_err("wait_for_fences must fail once the device is lost");
    assert!(wait_err.is_device_lost());

    handle.join().unwrap();
}
