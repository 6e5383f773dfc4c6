//! Project files.
//!
//! Loading never fails: a missing, unreadable or malformed file yields an
//! empty project, and rings that break the surface invariant are dropped
//! wholesale in favour of an empty surface.

use crate::error::Result;
use crate::geometry::rings_valid;
use crate::model::{Pattern, Project, Surface};
use crate::pattern::default_pattern;
use std::path::Path;
use tracing::{info, warn};

pub const DEFAULT_SURFACE_ID: &str = "surface";

pub fn parse_project(text: &str) -> Option<Project> {
    match serde_json::from_str::<Project>(text) {
        Ok(project) => Some(project),
        Err(e) => {
            warn!(error = %e, "malformed project, starting empty");
            None
        }
    }
}

pub fn read_project(path: &Path) -> Result<Project> {
    let text = std::fs::read_to_string(path)?;
    Ok(serde_json::from_str(&text)?)
}

/// Project at `path`, or an empty one.
pub fn load_project(path: &Path) -> Project {
    match read_project(path) {
        Ok(project) => {
            info!(path = %path.display(), rings = project.rings.len(), "loaded project");
            project
        }
        Err(e) => {
            warn!(path = %path.display(), error = %e, "could not load project, starting empty");
            Project::default()
        }
    }
}

/// The surface a project describes, provided its rings are valid.
pub fn project_surface(project: &Project) -> Surface {
    let id = if project.id.is_empty() {
        DEFAULT_SURFACE_ID
    } else {
        project.id.as_str()
    };
    let rings: Vec<_> = project
        .rings
        .iter()
        .filter(|r| !r.is_empty())
        .cloned()
        .collect();
    if rings.iter().any(|r| r.len() < 3) || !rings_valid(&rings) {
        warn!(rings = rings.len(), "stored rings are invalid, starting empty");
        return Surface::empty(id);
    }
    Surface::new(id, rings)
}

pub fn project_pattern(project: &Project) -> Pattern {
    project
        .pattern
        .clone()
        .filter(|p| p.width > 0.0 && p.height > 0.0)
        .unwrap_or_else(default_pattern)
}

pub fn to_project(surface: &Surface, pattern: &Pattern, base: &Project) -> Project {
    Project {
        id: surface.id.clone(),
        rings: surface.rings.clone(),
        pattern: Some(pattern.clone()),
        textures: base.textures.clone(),
    }
}

pub fn save_project(path: &Path, project: &Project) -> Result<()> {
    let json = serde_json::to_string_pretty(project)?;
    std::fs::write(path, json)?;
    info!(path = %path.display(), "saved project");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::Point;

    #[test]
    fn garbage_degrades_to_empty_surface() {
        assert!(parse_project("not json").is_none());
        let project = parse_project("{}").unwrap();
        let surface = project_surface(&project);
        assert!(surface.is_empty());
        assert_eq!(surface.id, DEFAULT_SURFACE_ID);
        assert_eq!(project_pattern(&project), default_pattern());
    }

    #[test]
    fn self_intersecting_rings_are_refused() {
        let project = parse_project(r#"{"id":"a","rings":[[[0,0],[10,10],[10,0],[0,10]]]}"#).unwrap();
        assert!(project_surface(&project).is_empty());
    }

    #[test]
    fn valid_rings_load() {
        let project = parse_project(r#"{"id":"a","rings":[[[0,0],[200,0],[200,100],[0,100]]]}"#).unwrap();
        let surface = project_surface(&project);
        assert_eq!(surface.id, "a");
        assert_eq!(surface.rings[0][2], Point::new(200.0, 100.0));
    }

    #[test]
    fn missing_file_is_an_empty_project() {
        let project = load_project(Path::new("/definitely/not/here.json"));
        assert_eq!(project, Project::default());
    }

    #[test]
    fn save_and_reload() {
        let path = std::env::temp_dir().join(format!("surface-tiler-project-{}.json", std::process::id()));
        let surface = Surface::new(
            "room",
            vec![vec![Point::new(0.0, 0.0), Point::new(50.0, 0.0), Point::new(0.0, 50.0)]],
        );
        let mut base = Project::default();
        base.textures.insert("oak".into(), "oak.png".into());
        let project = to_project(&surface, &default_pattern(), &base);
        save_project(&path, &project).unwrap();
        let back = load_project(&path);
        assert_eq!(back, project);
        assert_eq!(project_surface(&back), surface);
        std::fs::remove_file(&path).ok();
    }
}
