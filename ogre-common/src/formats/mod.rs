//! Interchange document codecs
//!
//! - `mesh_xml` / `skeleton_xml`: Ogre XML, read by the external converter
//! - `repx` / `nxustream`: PhysX 3 and PhysX 2.8 collision descriptions
//! - `material`: Ogre material scripts (write only)

pub mod material;
pub mod mesh_xml;
pub mod nxustream;
pub mod repx;
pub mod skeleton_xml;
pub mod xml;

pub use material::{MaterialDef, write_material_script};
pub use mesh_xml::{MeshXml, read_mesh};
pub use nxustream::NxuStreamDocument;
pub use repx::{RepxDocument, content_id};
pub use xml::{FromXml, ToXml};
