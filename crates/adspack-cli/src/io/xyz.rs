use adspack::core::models::atom::Atom;
use adspack::core::models::substrate::Lattice;
use nalgebra::{Point3, Vector3};
use std::fs::File;
use std::io::{self, BufRead, BufReader, Write};
use std::path::Path;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum XyzError {
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
    #[error("Parse error on line {line}: {kind}")]
    Parse { line: usize, kind: XyzParseErrorKind },
    #[error("Frame declares {expected} atoms but only {found} follow")]
    Truncated { expected: usize, found: usize },
    #[error("File contains no frames")]
    Empty,
}

#[derive(Debug, Error, PartialEq)]
pub enum XyzParseErrorKind {
    #[error("Invalid atom count '{0}'")]
    InvalidAtomCount(String),
    #[error("Atom record needs an element and three coordinates")]
    MissingField,
    #[error("Invalid coordinate '{0}'")]
    InvalidFloat(String),
    #[error("Lattice needs nine numbers, got '{0}'")]
    InvalidLattice(String),
}

/// One frame of an XYZ file. Extra columns after the coordinates are ignored.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct XyzFrame {
    pub comment: String,
    pub atoms: Vec<Atom>,
}

impl XyzFrame {
    /// The extended-XYZ `Lattice="ax ay az bx by bz cx cy cz"` entry of the comment line.
    pub fn lattice(&self) -> Result<Option<Lattice>, XyzParseErrorKind> {
        let Some(start) = self.comment.find("Lattice=\"") else {
            return Ok(None);
        };
        let rest = &self.comment[start + "Lattice=\"".len()..];
        let body = rest.split('"').next().unwrap_or_default();
        let values: Vec<f64> = body
            .split_whitespace()
            .map(str::parse)
            .collect::<Result<_, _>>()
            .map_err(|_| XyzParseErrorKind::InvalidLattice(body.to_string()))?;
        if values.len() != 9 {
            return Err(XyzParseErrorKind::InvalidLattice(body.to_string()));
        }
        Ok(Some(Lattice {
            a: Vector3::new(values[0], values[1], values[2]),
            b: Vector3::new(values[3], values[4], values[5]),
            c: Vector3::new(values[6], values[7], values[8]),
        }))
    }
}

pub struct XyzFile;

impl XyzFile {
    /// Reads every frame, skipping blank lines between frames.
    pub fn read_frames(reader: &mut impl BufRead) -> Result<Vec<XyzFrame>, XyzError> {
        let mut frames = Vec::new();
        let mut lines = reader.lines().enumerate();

        while let Some((index, line)) = lines.next() {
            let line = line?;
            let header = line.trim();
            if header.is_empty() {
                continue;
            }
            let count: usize = header.parse().map_err(|_| XyzError::Parse {
                line: index + 1,
                kind: XyzParseErrorKind::InvalidAtomCount(header.to_string()),
            })?;

            let comment = match lines.next() {
                Some((_, line)) => line?.trim_end().to_string(),
                None => {
                    return Err(XyzError::Truncated {
                        expected: count,
                        found: 0,
                    });
                }
            };

            let mut atoms = Vec::with_capacity(count);
            for found in 0..count {
                let Some((index, line)) = lines.next() else {
                    return Err(XyzError::Truncated {
                        expected: count,
                        found,
                    });
                };
                let atom = parse_atom(&line?).map_err(|kind| XyzError::Parse {
                    line: index + 1,
                    kind,
                })?;
                atoms.push(atom);
            }
            frames.push(XyzFrame { comment, atoms });
        }
        Ok(frames)
    }

    /// Reads the first frame.
    pub fn read_from(reader: &mut impl BufRead) -> Result<XyzFrame, XyzError> {
        Self::read_frames(reader)?
            .into_iter()
            .next()
            .ok_or(XyzError::Empty)
    }

    pub fn read_from_path<P: AsRef<Path>>(path: P) -> Result<XyzFrame, XyzError> {
        let mut reader = BufReader::new(File::open(path)?);
        Self::read_from(&mut reader)
    }

    /// Appends one frame.
    pub fn write_frame<'a>(
        writer: &mut impl Write,
        comment: &str,
        atoms: impl ExactSizeIterator<Item = (&'a str, Point3<f64>)>,
    ) -> io::Result<()> {
        writeln!(writer, "{}", atoms.len())?;
        writeln!(writer, "{}", comment.replace('\n', " "))?;
        for (element, p) in atoms {
            writeln!(
                writer,
                "{:<3} {:>15.8} {:>15.8} {:>15.8}",
                element, p.x, p.y, p.z
            )?;
        }
        Ok(())
    }
}

fn parse_atom(line: &str) -> Result<Atom, XyzParseErrorKind> {
    let mut fields = line.split_whitespace();
    let element = fields.next().ok_or(XyzParseErrorKind::MissingField)?;
    let mut coordinate = || -> Result<f64, XyzParseErrorKind> {
        let field = fields.next().ok_or(XyzParseErrorKind::MissingField)?;
        field
            .parse()
            .map_err(|_| XyzParseErrorKind::InvalidFloat(field.to_string()))
    };
    let (x, y, z) = (coordinate()?, coordinate()?, coordinate()?);
    Ok(Atom::new(element, Point3::new(x, y, z)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    const TWO_FRAMES: &str = "\
3
Lattice=\"5.0 0.0 0.0 0.0 5.0 0.0 0.0 0.0 20.0\" pbc=\"T T F\"
Cu 0.0 0.0 0.0
Cu 2.5 0.0 0.0
Cu 1.25 2.1 0.0 extra columns
1
second
O 0 0 1.5

";

    #[test]
    fn reads_all_frames() {
        let frames = XyzFile::read_frames(&mut Cursor::new(TWO_FRAMES)).unwrap();
        assert_eq!(frames.len(), 2);
        assert_eq!(frames[0].atoms.len(), 3);
        assert_eq!(frames[0].atoms[2].position, Point3::new(1.25, 2.1, 0.0));
        assert_eq!(frames[1].comment, "second");
        assert_eq!(frames[1].atoms[0].element, "O");
    }

    #[test]
    fn parses_extended_lattice() {
        let frame = XyzFile::read_from(&mut Cursor::new(TWO_FRAMES)).unwrap();
        let lattice = frame.lattice().unwrap().unwrap();
        assert_eq!(lattice.c, Vector3::new(0.0, 0.0, 20.0));

        let plain = XyzFrame {
            comment: "no cell here".to_string(),
            atoms: Vec::new(),
        };
        assert_eq!(plain.lattice(), Ok(None));
    }

    #[test]
    fn reports_malformed_input() {
        let bad_count = XyzFile::read_from(&mut Cursor::new("three\n\n"));
        assert!(matches!(
            bad_count,
            Err(XyzError::Parse {
                line: 1,
                kind: XyzParseErrorKind::InvalidAtomCount(_)
            })
        ));

        let bad_coordinate = XyzFile::read_from(&mut Cursor::new("1\nc\nH 0.0 x 0.0\n"));
        assert!(matches!(
            bad_coordinate,
            Err(XyzError::Parse {
                line: 3,
                kind: XyzParseErrorKind::InvalidFloat(_)
            })
        ));

        let truncated = XyzFile::read_from(&mut Cursor::new("2\nc\nH 0 0 0\n"));
        assert!(matches!(
            truncated,
            Err(XyzError::Truncated {
                expected: 2,
                found: 1
            })
        ));

        assert!(matches!(
            XyzFile::read_from(&mut Cursor::new("\n\n")),
            Err(XyzError::Empty)
        ));
    }

    #[test]
    fn written_frames_read_back() {
        let atoms = [
            ("C", Point3::new(0.0, 0.0, 1.0)),
            ("O", Point3::new(0.0, 0.0, 2.15)),
        ];
        let mut buffer = Vec::new();
        XyzFile::write_frame(&mut buffer, "frame 0", atoms.iter().map(|(e, p)| (*e, *p)))
            .unwrap();
        XyzFile::write_frame(&mut buffer, "frame 1", atoms.iter().map(|(e, p)| (*e, *p)))
            .unwrap();

        let frames = XyzFile::read_frames(&mut Cursor::new(buffer)).unwrap();
        assert_eq!(frames.len(), 2);
        assert_eq!(frames[1].comment, "frame 1");
        assert!((frames[0].atoms[1].position - atoms[1].1).norm() < 1e-8);
    }
}
