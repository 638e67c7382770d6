//! ---
//! iotlab_section: "05-networking-external-interfaces"
//! iotlab_subsection: "module"
//! iotlab_type: "source"
//! iotlab_scope: "code"
//! iotlab_description: "HTTP surface for sensor and file resources."
//! iotlab_version: "v0.0.0-prealpha"
//! iotlab_owner: "tbd"
//! ---
pub(crate) mod files;
pub(crate) mod sensors;
