//! `vkCreateInstance` and physical device enumeration/properties.

use venus_registry::{ClientKey, Instance, InstanceRecord, PhysicalDevice, PhysicalDeviceRecord};
use venus_wire::command::{CommandFlags, CommandId};
use venus_wire::commands::instance::*;

use crate::{invalid_usage, vk_result_from_i32, Driver, DriverError, Result};

impl Driver {
    /// Confirms the server speaks a registry version this client
    /// understands before anything else is attempted on the connection
    ///.
    pub fn enumerate_instance_version(&self) -> Result<u32> {
        let reply = self.ring.call(
            CommandId::ENUMERATE_INSTANCE_VERSION,
            CommandFlags::empty(),
            |enc| encode_enumerate_instance_version_args(enc, &EnumerateInstanceVersionArgs),
            decode_enumerate_instance_version_reply,
        )?;
        if reply.result != 0 {
            return Err(DriverError::Vulkan(vk_result_from_i32(reply.result)));
        }
        Ok(reply.api_version)
    }

    pub fn create_instance(&self, application_name: &str, enabled_extensions: &[String]) -> Result<ClientKey<Instance>> {
        let args = CreateInstanceArgs {
            api_version: venus_wire::VULKAN_XML_REGISTRY_VERSION,
            application_name: application_name.to_string(),
            enabled_extensions: enabled_extensions.to_vec(),
        };
        let reply = self.ring.call(
            CommandId::CREATE_INSTANCE,
            CommandFlags::empty(),
            |enc| encode_create_instance_args(enc, &args),
            decode_create_instance_reply,
        )?;
        if reply.result != 0 {
            return Err(DriverError::Vulkan(vk_result_from_i32(reply.result)));
        }
        let key = self.registry.allocate_instance_key();
        self.registry.insert_instance(
            key,
            InstanceRecord {
                server_identity: reply.instance,
            },
        );
        Ok(key)
    }

    pub fn destroy_instance(&self, instance: ClientKey<Instance>) -> Result<()> {
        let identity = self.registry.instance_identity(instance).map_err(invalid_usage)?;
        self.ring.send(
            CommandId::DESTROY_INSTANCE,
            CommandFlags::empty(),
            |enc| encode_destroy_instance_args(enc, &DestroyInstanceArgs { instance: identity }),
        )?;
        self.registry.remove_instance(instance);
        Ok(())
    }

    pub fn enumerate_physical_devices(&self, instance: ClientKey<Instance>) -> Result<Vec<ClientKey<PhysicalDevice>>> {
        let identity = self.registry.instance_identity(instance).map_err(invalid_usage)?;
        let reply = self.ring.call(
            CommandId::ENUMERATE_PHYSICAL_DEVICES,
            CommandFlags::empty(),
            |enc| encode_enumerate_physical_devices_args(enc, &EnumeratePhysicalDevicesArgs { instance: identity }),
            decode_enumerate_physical_devices_reply,
        )?;
        if reply.result != 0 {
            return Err(DriverError::Vulkan(vk_result_from_i32(reply.result)));
        }
        Ok(reply
            .physical_devices
            .into_iter()
            .map(|server_identity| {
                let key = self.registry.allocate_physical_device_key();
                self.registry.insert_physical_device(
                    key,
                    PhysicalDeviceRecord {
                        instance,
                        server_identity,
                    },
                );
                key
            })
            .collect())
    }

    pub fn get_physical_device_properties(&self, physical_device: ClientKey<PhysicalDevice>) -> Result<PhysicalDeviceProperties> {
        let identity = self
            .registry
            .physical_device_identity(physical_device)
            .map_err(invalid_usage)?;
        self.ring.call(
            CommandId::GET_PHYSICAL_DEVICE_PROPERTIES,
            CommandFlags::empty(),
            |enc| {
                encode_get_physical_device_properties_args(
                    enc,
                    &GetPhysicalDevicePropertiesArgs {
                        physical_device: identity,
                    },
                )
            },
            decode_physical_device_properties,
        )
        .map_err(Into::into)
    }

    pub fn get_physical_device_memory_properties(
        &self,
        physical_device: ClientKey<PhysicalDevice>,
    ) -> Result<PhysicalDeviceMemoryProperties> {
        let identity = self
            .registry
            .physical_device_identity(physical_device)
            .map_err(invalid_usage)?;
        self.ring.call(
            CommandId::GET_PHYSICAL_DEVICE_MEMORY_PROPERTIES,
            CommandFlags::empty(),
            |enc| {
                encode_get_physical_device_properties_args(
                    enc,
                    &GetPhysicalDevicePropertiesArgs {
                        physical_device: identity,
                    },
                )
            },
            decode_physical_device_memory_properties,
        )
        .map_err(Into::into)
    }
}
