//! `vkCreateDevice` and `vkGetDeviceQueue`.

use venus_registry::{ClientKey, Device, DeviceRecord, PhysicalDevice, Queue, QueueRecord};
use venus_wire::command::{CommandFlags, CommandId};
use venus_wire::commands::device::*;

use crate::{invalid_usage, vk_result_from_i32, Driver, DriverError, Result};

impl Driver {
    pub fn create_device(
        &self,
        physical_device: ClientKey<PhysicalDevice>,
        queue_create_infos: &[QueueCreateInfo],
        enabled_extensions: &[String],
    ) -> Result<ClientKey<Device>> {
        let identity = self
            .registry
            .physical_device_identity(physical_device)
            .map_err(invalid_usage)?;
        let args = CreateDeviceArgs {
            physical_device: identity,
            queue_create_infos: queue_create_infos.to_vec(),
            enabled_extensions: enabled_extensions.to_vec(),
        };
        let reply = self.ring.call(
            CommandId::CREATE_DEVICE,
            CommandFlags::empty(),
            |enc| encode_create_device_args(enc, &args),
            decode_create_device_reply,
        )?;
        if reply.result != 0 {
            return Err(DriverError::Vulkan(vk_result_from_i32(reply.result)));
        }
        let key = self.registry.allocate_device_key();
        self.registry.insert_device(
            key,
            DeviceRecord {
                physical_device,
                server_identity: reply.device,
            },
        );
        Ok(key)
    }

    /// Tears down a device and every object tracked underneath it, in the
    /// registry's fixed lock order, then drops its shadow mappings before
    /// sending the wire command -- the server is free to reclaim the
    /// memory the instant it sees `DESTROY_DEVICE`.
    pub fn destroy_device(&self, device: ClientKey<Device>) -> Result<()> {
        let identity = self.registry.device_identity(device).map_err(invalid_usage)?;
        self.shadow.lock().remove_device(identity);
        self.ring.send(CommandId::DESTROY_DEVICE, CommandFlags::empty(), |enc| {
            encode_destroy_device_args(enc, &DestroyDeviceArgs { device: identity })
        })?;
        self.registry.remove_device(device);
        Ok(())
    }

    pub fn get_device_queue(&self, device: ClientKey<Device>, queue_family_index: u32, queue_index: u32) -> Result<ClientKey<Queue>> {
        let identity = self.registry.device_identity(device).map_err(invalid_usage)?;
        let reply = self.ring.call(
            CommandId::GET_DEVICE_QUEUE,
            CommandFlags::empty(),
            |enc| {
                encode_get_device_queue_args(
                    enc,
                    &GetDeviceQueueArgs {
                        device: identity,
                        queue_family_index,
                        queue_index,
                    },
                )
            },
            decode_get_device_queue_reply,
        )?;
        let key = self.registry.allocate_queue_key();
        self.registry.insert_queue(
            key,
            QueueRecord {
                device,
                server_identity: reply.queue,
                queue_family_index,
                queue_index,
            },
        );
        Ok(key)
    }
}
