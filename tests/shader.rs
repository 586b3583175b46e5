use naga::valid::{Capabilities, ValidationFlags, Validator};
use naga::{ShaderStage, TypeInner};

const SOURCE: &str = include_str!("../src/shader_projection.wgsl");

fn parse() -> naga::Module {
    naga::front::wgsl::parse_str(SOURCE).unwrap_or_else(|e| panic!("{}", e.emit_to_string(SOURCE)))
}

#[test]
fn projection_shader_validates() {
    let module = parse();
    Validator::new(ValidationFlags::all(), Capabilities::empty())
        .validate(&module)
        .unwrap();
}

#[test]
fn projection_shader_has_fullscreen_entry_points() {
    let module = parse();
    let stage_of = |name: &str| {
        module
            .entry_points
            .iter()
            .find(|e| e.name == name)
            .map(|e| e.stage)
    };
    assert_eq!(stage_of("vs_main"), Some(ShaderStage::Vertex));
    assert_eq!(stage_of("fs_main"), Some(ShaderStage::Fragment));
}

#[test]
fn projection_uniform_is_64_bytes() {
    // must match `ProjectionUniform` on the CPU side
    let module = parse();
    let span = module
        .types
        .iter()
        .find(|(_, ty)| ty.name.as_deref() == Some("Projection"))
        .map(|(_, ty)| match ty.inner {
            TypeInner::Struct { span, .. } => span,
            ref other => panic!("Projection is not a struct: {other:?}"),
        })
        .expect("Projection struct missing");
    assert_eq!(span, 64);
}
