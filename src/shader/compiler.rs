//! WGSL stage compilation, program linking and uniform reflection
//!
//! Each stage is parsed and validated on its own with naga, so a failure is
//! reported against the stage that caused it. Linking merges the uniform
//! tables of both stages into the table a backend program is built from.

use std::collections::HashMap;

use crate::backend::{ShaderStage, ShaderStageFlags, UniformInfo, UniformType};
use crate::shader::ShaderError;

/// A validated stage and the uniforms its entry point uses
#[derive(Debug, Clone)]
pub struct CompiledStage {
    pub stage: ShaderStage,
    pub entry_point: String,
    pub uniforms: Vec<UniformInfo>,
}

/// Result of linking a vertex and a fragment stage
#[derive(Debug, Clone)]
pub struct LinkedProgram {
    pub vertex_entry: String,
    pub fragment_entry: String,
    /// Sorted by (group, binding); a uniform's location is its index
    pub uniforms: Vec<UniformInfo>,
}

fn naga_stage(stage: ShaderStage) -> naga::ShaderStage {
    match stage {
        ShaderStage::Vertex => naga::ShaderStage::Vertex,
        ShaderStage::Fragment => naga::ShaderStage::Fragment,
    }
}

fn scalar_uniform_type(scalar: naga::Scalar) -> Option<UniformType> {
    match (scalar.kind, scalar.width) {
        (naga::ScalarKind::Float, 4) => Some(UniformType::Float),
        (naga::ScalarKind::Sint, 4) => Some(UniformType::Int),
        _ => None,
    }
}

fn uniform_type(inner: &naga::TypeInner) -> Option<UniformType> {
    use naga::{ScalarKind, TypeInner, VectorSize};

    match *inner {
        TypeInner::Scalar(scalar) => scalar_uniform_type(scalar),
        TypeInner::Vector { size, scalar } if scalar.kind == ScalarKind::Float && scalar.width == 4 => {
            match size {
                VectorSize::Bi => Some(UniformType::Float2),
                VectorSize::Tri => Some(UniformType::Float3),
                VectorSize::Quad => Some(UniformType::Float4),
            }
        }
        TypeInner::Matrix {
            columns: VectorSize::Tri,
            rows: VectorSize::Tri,
            scalar,
        } if scalar.width == 4 => Some(UniformType::Mat3),
        TypeInner::Matrix {
            columns: VectorSize::Quad,
            rows: VectorSize::Quad,
            scalar,
        } if scalar.width == 4 => Some(UniformType::Mat4),
        _ => None,
    }
}

/// Parse, validate and reflect one stage
pub fn compile_stage(stage: ShaderStage, source: &str) -> Result<CompiledStage, ShaderError> {
    let module = naga::front::wgsl::parse_str(source).map_err(|e| ShaderError::Compile {
        stage,
        log: e.emit_to_string(source),
    })?;

    let mut validator = naga::valid::Validator::new(
        naga::valid::ValidationFlags::all(),
        naga::valid::Capabilities::all(),
    );
    let info = validator.validate(&module).map_err(|e| ShaderError::Compile {
        stage,
        log: e.emit_to_string(source),
    })?;

    let entry_index = module
        .entry_points
        .iter()
        .position(|ep| ep.stage == naga_stage(stage))
        .ok_or(ShaderError::MissingEntryPoint { stage })?;
    let entry_point = &module.entry_points[entry_index];
    let usage = info.get_entry_point(entry_index);

    let mut uniforms = Vec::new();
    for (handle, var) in module.global_variables.iter() {
        if var.space != naga::AddressSpace::Uniform {
            continue;
        }
        // Uniforms the entry point never touches are left out of the table
        if usage[handle].is_empty() {
            continue;
        }

        let name = var.name.clone().unwrap_or_default();
        let Some(binding) = var.binding.as_ref() else {
            return Err(ShaderError::Compile {
                stage,
                log: format!("uniform `{}` has no @group/@binding", name),
            });
        };
        let Some(ty) = uniform_type(&module.types[var.ty].inner) else {
            return Err(ShaderError::Compile {
                stage,
                log: format!("uniform `{}` has an unsupported type", name),
            });
        };

        uniforms.push(UniformInfo {
            name,
            ty,
            group: binding.group,
            binding: binding.binding,
            visibility: stage.flag(),
        });
    }

    log::trace!(
        "Compiled {} stage `{}` with {} uniforms",
        stage,
        entry_point.name,
        uniforms.len()
    );

    Ok(CompiledStage {
        stage,
        entry_point: entry_point.name.clone(),
        uniforms,
    })
}

/// Merge the two stages' uniform tables
///
/// A uniform used by both stages must agree on binding and type, and two
/// differently named uniforms may not share a binding.
pub fn link(vertex: &CompiledStage, fragment: &CompiledStage) -> Result<LinkedProgram, ShaderError> {
    let mut by_name: HashMap<&str, UniformInfo> = HashMap::new();
    for uniform in vertex.uniforms.iter().chain(&fragment.uniforms) {
        match by_name.get_mut(uniform.name.as_str()) {
            Some(existing) => {
                if (existing.group, existing.binding) != (uniform.group, uniform.binding) {
                    return Err(ShaderError::Link {
                        log: format!(
                            "uniform `{}` bound at ({}, {}) and ({}, {})",
                            uniform.name,
                            existing.group,
                            existing.binding,
                            uniform.group,
                            uniform.binding
                        ),
                    });
                }
                if existing.ty != uniform.ty {
                    return Err(ShaderError::Link {
                        log: format!(
                            "uniform `{}` declared as {:?} and {:?}",
                            uniform.name, existing.ty, uniform.ty
                        ),
                    });
                }
                existing.visibility |= uniform.visibility;
            }
            None => {
                by_name.insert(uniform.name.as_str(), uniform.clone());
            }
        }
    }

    let mut uniforms: Vec<UniformInfo> = by_name.into_values().collect();
    uniforms.sort_by_key(|u| (u.group, u.binding));

    for pair in uniforms.windows(2) {
        if (pair[0].group, pair[0].binding) == (pair[1].group, pair[1].binding) {
            return Err(ShaderError::Link {
                log: format!(
                    "uniforms `{}` and `{}` share binding ({}, {})",
                    pair[0].name, pair[1].name, pair[0].group, pair[0].binding
                ),
            });
        }
    }

    Ok(LinkedProgram {
        vertex_entry: vertex.entry_point.clone(),
        fragment_entry: fragment.entry_point.clone(),
        uniforms,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    const VERTEX: &str = r#"
@group(0) @binding(0) var<uniform> u_ViewProjection: mat4x4<f32>;
@group(0) @binding(1) var<uniform> u_Transform: mat4x4<f32>;

@vertex
fn vs_main(@location(0) position: vec3<f32>) -> @builtin(position) vec4<f32> {
    return u_ViewProjection * u_Transform * vec4<f32>(position, 1.0);
}
"#;

    const FRAGMENT: &str = r#"
@group(0) @binding(2) var<uniform> u_Color: vec4<f32>;

@fragment
fn fs_main() -> @location(0) vec4<f32> {
    return u_Color;
}
"#;

    #[test]
    fn test_reflects_uniforms() {
        let vertex = compile_stage(ShaderStage::Vertex, VERTEX).unwrap();
        assert_eq!(vertex.entry_point, "vs_main");
        assert_eq!(vertex.uniforms.len(), 2);

        let fragment = compile_stage(ShaderStage::Fragment, FRAGMENT).unwrap();
        let linked = link(&vertex, &fragment).unwrap();

        let names: Vec<&str> = linked.uniforms.iter().map(|u| u.name.as_str()).collect();
        assert_eq!(names, vec!["u_ViewProjection", "u_Transform", "u_Color"]);
        assert_eq!(linked.uniforms[2].ty, UniformType::Float4);
        assert_eq!(linked.uniforms[2].visibility, ShaderStageFlags::FRAGMENT);
    }

    #[test]
    fn test_syntax_error_reports_stage() {
        let err = compile_stage(ShaderStage::Fragment, "fn broken( {").unwrap_err();
        match err {
            ShaderError::Compile { stage, log } => {
                assert_eq!(stage, ShaderStage::Fragment);
                assert!(!log.is_empty());
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_missing_entry_point() {
        let err = compile_stage(ShaderStage::Vertex, FRAGMENT).unwrap_err();
        assert!(matches!(
            err,
            ShaderError::MissingEntryPoint {
                stage: ShaderStage::Vertex
            }
        ));
    }

    #[test]
    fn test_link_rejects_binding_clash() {
        let vertex = compile_stage(ShaderStage::Vertex, VERTEX).unwrap();
        let fragment = compile_stage(
            ShaderStage::Fragment,
            r#"
@group(0) @binding(1) var<uniform> u_Color: vec4<f32>;

@fragment
fn fs_main() -> @location(0) vec4<f32> {
    return u_Color;
}
"#,
        )
        .unwrap();

        assert!(matches!(link(&vertex, &fragment), Err(ShaderError::Link { .. })));
    }

    #[test]
    fn test_shared_uniform_visible_to_both_stages() {
        let vertex = compile_stage(ShaderStage::Vertex, VERTEX).unwrap();
        let fragment = compile_stage(
            ShaderStage::Fragment,
            r#"
@group(0) @binding(1) var<uniform> u_Transform: mat4x4<f32>;

@fragment
fn fs_main() -> @location(0) vec4<f32> {
    return u_Transform[0];
}
"#,
        )
        .unwrap();

        let linked = link(&vertex, &fragment).unwrap();
        let transform = linked
            .uniforms
            .iter()
            .find(|u| u.name == "u_Transform")
            .unwrap();
        assert_eq!(transform.visibility, ShaderStageFlags::VERTEX_FRAGMENT);
        assert_eq!(linked.uniforms.len(), 2);
    }
}
