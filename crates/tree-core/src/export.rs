//! Wavefront OBJ output.

use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

use tracing::info;

use crate::error::ExportError;
use crate::meshing::GeometryBuffer;

/// Compact `buffer`, then write it as a single OBJ object called `name`.
///
/// Colors are not part of the format and are left out. A buffer without
/// texcoords or normals gets one placeholder of each so every face can use
/// the `v/t/n` form.
pub fn write_obj<W: Write>(buffer: &mut GeometryBuffer, name: &str, mut out: W) -> Result<(), ExportError> {
    buffer.compact();

    writeln!(out, "# {name}")?;
    writeln!(out, "o {name}")?;
    for v in buffer.vertices() {
        writeln!(out, "v {} {} {}", v.x, v.y, v.z)?;
    }
    if buffer.texcoords().is_empty() {
        writeln!(out, "vt 0 0")?;
    }
    for t in buffer.texcoords() {
        writeln!(out, "vt {} {}", t.x, t.y)?;
    }
    if buffer.normals().is_empty() {
        writeln!(out, "vn 0 1 0")?;
    }
    for n in buffer.normals() {
        writeln!(out, "vn {} {} {}", n.x, n.y, n.z)?;
    }

    let placeholder = |empty: bool, i: u32| if empty { 1 } else { i + 1 };
    let (no_texcoords, no_normals) = (buffer.texcoords().is_empty(), buffer.normals().is_empty());
    for face in buffer.faces() {
        write!(out, "f")?;
        for k in 0..3 {
            write!(
                out,
                " {}/{}/{}",
                face.vertices[k] + 1,
                placeholder(no_texcoords, face.texcoords[k]),
                placeholder(no_normals, face.normals[k]),
            )?;
        }
        writeln!(out)?;
    }
    out.flush()?;
    Ok(())
}

/// [`write_obj`] into a new file at `path`.
pub fn save_obj(buffer: &mut GeometryBuffer, name: &str, path: impl AsRef<Path>) -> Result<(), ExportError> {
    let path = path.as_ref();
    let file = File::create(path)?;
    write_obj(buffer, name, BufWriter::new(file))?;
    info!(
        path = %path.display(),
        vertices = buffer.vertex_count(),
        faces = buffer.face_count(),
        "wrote mesh"
    );
    Ok(())
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::meshing::{add_cone, Cone, Scratch, StreamCounts};
    use glam::Vec3;

    fn to_string(buffer: &mut GeometryBuffer, name: &str) -> String {
        let mut out = Vec::new();
        write_obj(buffer, name, &mut out).unwrap();
        String::from_utf8(out).unwrap()
    }

    #[test]
    fn cone_as_obj() {
        let mut buffer = GeometryBuffer::new();
        add_cone(&mut buffer, &Cone::new(1., 2.), 0).unwrap();
        let text = to_string(&mut buffer, "cone");
        let mut lines = text.lines();
        assert_eq!(lines.next(), Some("# cone"));
        assert_eq!(lines.next(), Some("o cone"));
        assert_eq!(lines.next(), Some("v 0 2 0"));
        let count = |prefix: &str| text.lines().filter(|l| l.starts_with(prefix)).count();
        assert_eq!(count("v "), buffer.vertex_count());
        assert_eq!(count("vt "), buffer.texcoord_count());
        assert_eq!(count("vn "), buffer.normal_count());
        assert_eq!(count("f "), buffer.face_count());
        // one-based
        assert!(text.contains("f 1/1/1 "));
    }

    #[test]
    fn placeholders_without_attributes() {
        let mut buffer = GeometryBuffer::new();
        let counts = StreamCounts {
            vertices: 3,
            faces: 1,
            ..StreamCounts::default()
        };
        let reservation = buffer.reserve(counts).unwrap();
        let mut scratch = Scratch::with_counts(counts);
        scratch.vertices.extend([Vec3::ZERO, Vec3::X, Vec3::Z]);
        scratch.faces.push(reservation.face([0, 1, 2], [0; 3], [0; 3], [0; 3]));
        buffer.commit(reservation, scratch);

        let text = to_string(&mut buffer, "tri");
        assert!(text.contains("\nvt 0 0\n"));
        assert!(text.contains("\nvn 0 1 0\n"));
        assert!(text.ends_with("f 1/1/1 2/1/1 3/1/1\n"));
    }

    #[test]
    fn empty_buffer() {
        let text = to_string(&mut GeometryBuffer::new(), "nothing");
        assert_eq!(text, "# nothing\no nothing\nvt 0 0\nvn 0 1 0\n");
    }
}
