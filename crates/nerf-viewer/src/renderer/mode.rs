//! The forward/deferred boundary.
//!
//! Both rendering modes share one geometry stage; they differ in where
//! the MLP runs and therefore in the attachment and pass topology. All of
//! that branching is centralized here: [`RenderMode`] answers the
//! structural questions and [`RenderMode::pass_plan`] produces the full
//! topology as plain data, which the renderer realizes with wgpu passes
//! (wgpu has no subpass API; each subpass becomes a render pass in the
//! same encoder, and the recorded dependencies are realized by wgpu's
//! attachment-to-texture usage tracking).

use nerf_assets::TextureQuality;

/// Fixed format of the third geometry output (per-pixel view ray).
pub const RAY_DATA_FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::Rgba16Float;

/// Feature-map attachment format for the configured precision.
pub fn feature_format(quality: TextureQuality) -> wgpu::TextureFormat {
    match quality {
        TextureQuality::Rgba8 => wgpu::TextureFormat::Rgba8Unorm,
        TextureQuality::Rgba16Float => wgpu::TextureFormat::Rgba16Float,
        TextureQuality::Rgba32Float => wgpu::TextureFormat::Rgba32Float,
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RenderMode {
    /// One pass: the geometry fragment program evaluates the MLP inline
    /// and writes final color to the swapchain.
    Forward,
    /// Two subpasses: geometry fills the feature attachments, then a
    /// full-screen pass reads them and evaluates the MLP.
    Deferred,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AttachmentRole {
    Feature0,
    Feature1,
    RayData,
    Depth,
    Swapchain,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Attachment {
    pub role: AttachmentRole,
    pub format: wgpu::TextureFormat,
}

/// One subpass: which plan attachments it writes, tests and reads.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Subpass {
    pub colors: Vec<usize>,
    pub depth: Option<usize>,
    pub inputs: Vec<usize>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubpassRef {
    External,
    Index(usize),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Access {
    None,
    AttachmentWrite,
    InputRead,
    Present,
}

/// An execution-and-visibility edge between subpasses (or the outside
/// world), mirroring an explicit Vulkan subpass dependency.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PassDependency {
    pub src: SubpassRef,
    pub dst: SubpassRef,
    pub src_access: Access,
    pub dst_access: Access,
}

/// The complete render-pass topology for one mode, as data.
#[derive(Debug, Clone)]
pub struct PassPlan {
    pub attachments: Vec<Attachment>,
    pub subpasses: Vec<Subpass>,
    pub dependencies: Vec<PassDependency>,
}

impl RenderMode {
    pub fn from_flag(deferred: bool) -> Self {
        if deferred {
            RenderMode::Deferred
        } else {
            RenderMode::Forward
        }
    }

    pub fn attachment_count(&self) -> usize {
        match self {
            RenderMode::Forward => 2,
            RenderMode::Deferred => 5,
        }
    }

    pub fn subpass_count(&self) -> usize {
        match self {
            RenderMode::Forward => 1,
            RenderMode::Deferred => 2,
        }
    }

    /// Geometry-pass bind groups a model needs: the per-frame camera
    /// uniform must not be rebound under an in-flight frame in forward
    /// mode, while deferred reads its single set once per geometry pass.
    pub fn bind_groups_per_model(&self, frame_count: usize) -> usize {
        match self {
            RenderMode::Forward => frame_count,
            RenderMode::Deferred => 1,
        }
    }

    pub fn pass_plan(
        &self,
        quality: TextureQuality,
        depth_format: wgpu::TextureFormat,
        swapchain_format: wgpu::TextureFormat,
    ) -> PassPlan {
        match self {
            RenderMode::Forward => PassPlan {
                attachments: vec![
                    Attachment {
                        role: AttachmentRole::Depth,
                        format: depth_format,
                    },
                    Attachment {
                        role: AttachmentRole::Swapchain,
                        format: swapchain_format,
                    },
                ],
                subpasses: vec![Subpass {
                    colors: vec![1],
                    depth: Some(0),
                    inputs: vec![],
                }],
                dependencies: vec![],
            },
            RenderMode::Deferred => PassPlan {
                attachments: vec![
                    Attachment {
                        role: AttachmentRole::Feature0,
                        format: feature_format(quality),
                    },
                    Attachment {
                        role: AttachmentRole::Feature1,
                        format: feature_format(quality),
                    },
                    Attachment {
                        role: AttachmentRole::RayData,
                        format: RAY_DATA_FORMAT,
                    },
                    Attachment {
                        role: AttachmentRole::Depth,
                        format: depth_format,
                    },
                    Attachment {
                        role: AttachmentRole::Swapchain,
                        format: swapchain_format,
                    },
                ],
                subpasses: vec![
                    Subpass {
                        colors: vec![0, 1, 2],
                        depth: Some(3),
                        inputs: vec![],
                    },
                    Subpass {
                        colors: vec![4],
                        depth: None,
                        inputs: vec![0, 1, 2],
                    },
                ],
                dependencies: vec![
                    PassDependency {
                        src: SubpassRef::External,
                        dst: SubpassRef::Index(0),
                        src_access: Access::None,
                        dst_access: Access::AttachmentWrite,
                    },
                    PassDependency {
                        src: SubpassRef::Index(0),
                        dst: SubpassRef::Index(1),
                        src_access: Access::AttachmentWrite,
                        dst_access: Access::InputRead,
                    },
                    PassDependency {
                        src: SubpassRef::Index(1),
                        dst: SubpassRef::External,
                        src_access: Access::AttachmentWrite,
                        dst_access: Access::Present,
                    },
                ],
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const DEPTH: wgpu::TextureFormat = wgpu::TextureFormat::Depth32Float;
    const SWAP: wgpu::TextureFormat = wgpu::TextureFormat::Bgra8UnormSrgb;

    #[test]
    fn forward_topology() {
        let mode = RenderMode::from_flag(false);
        let plan = mode.pass_plan(TextureQuality::Rgba8, DEPTH, SWAP);

        assert_eq!(plan.attachments.len(), 2);
        assert_eq!(plan.attachments.len(), mode.attachment_count());
        assert_eq!(plan.subpasses.len(), 1);
        assert_eq!(plan.subpasses.len(), mode.subpass_count());

        let sp = &plan.subpasses[0];
        assert_eq!(sp.colors, vec![1]);
        assert_eq!(plan.attachments[1].role, AttachmentRole::Swapchain);
        assert_eq!(sp.depth, Some(0));
        assert!(sp.inputs.is_empty());
        assert!(plan.dependencies.is_empty());
    }

    #[test]
    fn deferred_topology() {
        let mode = RenderMode::from_flag(true);
        let plan = mode.pass_plan(TextureQuality::Rgba16Float, DEPTH, SWAP);

        assert_eq!(plan.attachments.len(), 5);
        assert_eq!(plan.attachments.len(), mode.attachment_count());
        assert_eq!(plan.subpasses.len(), 2);
        assert_eq!(plan.subpasses.len(), mode.subpass_count());

        // Subpass 1 reads exactly the three color attachments subpass 0
        // writes, and presents to the swapchain attachment.
        assert_eq!(plan.subpasses[1].inputs, plan.subpasses[0].colors);
        assert_eq!(plan.subpasses[1].inputs.len(), 3);
        assert_eq!(plan.subpasses[1].colors, vec![4]);
        assert_eq!(plan.subpasses[1].depth, None);
        assert_eq!(plan.attachments[4].role, AttachmentRole::Swapchain);
    }

    #[test]
    fn deferred_dependency_chain() {
        let plan =
            RenderMode::Deferred.pass_plan(TextureQuality::Rgba8, DEPTH, SWAP);
        assert_eq!(plan.dependencies.len(), 3);

        assert_eq!(plan.dependencies[0].src, SubpassRef::External);
        assert_eq!(plan.dependencies[0].dst, SubpassRef::Index(0));
        assert_eq!(plan.dependencies[0].dst_access, Access::AttachmentWrite);

        assert_eq!(plan.dependencies[1].src, SubpassRef::Index(0));
        assert_eq!(plan.dependencies[1].dst, SubpassRef::Index(1));
        assert_eq!(plan.dependencies[1].src_access, Access::AttachmentWrite);
        assert_eq!(plan.dependencies[1].dst_access, Access::InputRead);

        assert_eq!(plan.dependencies[2].src, SubpassRef::Index(1));
        assert_eq!(plan.dependencies[2].dst, SubpassRef::External);
        assert_eq!(plan.dependencies[2].dst_access, Access::Present);
    }

    #[test]
    fn feature_precision_propagates_into_the_plan() {
        for (quality, format) in [
            (TextureQuality::Rgba8, wgpu::TextureFormat::Rgba8Unorm),
            (TextureQuality::Rgba16Float, wgpu::TextureFormat::Rgba16Float),
            (TextureQuality::Rgba32Float, wgpu::TextureFormat::Rgba32Float),
        ] {
            let plan = RenderMode::Deferred.pass_plan(quality, DEPTH, SWAP);
            assert_eq!(plan.attachments[0].format, format);
            assert_eq!(plan.attachments[1].format, format);
            // The ray-data attachment keeps its fixed format.
            assert_eq!(plan.attachments[2].format, RAY_DATA_FORMAT);
        }
    }

    #[test]
    fn bind_group_replication_differs_by_mode() {
        assert_eq!(RenderMode::Deferred.bind_groups_per_model(3), 1);
        assert_eq!(RenderMode::Forward.bind_groups_per_model(3), 3);
    }
}
