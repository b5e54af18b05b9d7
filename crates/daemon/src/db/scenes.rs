use super::{now, parse_timestamp, Database};
use anyhow::Result;
use chrono::{DateTime, Utc};
use engine::bible::{ProjectBible, Script};
use rusqlite::{params, Connection, Row};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize)]
pub struct Scene {
    pub id: i64,
    pub project_id: i64,
    pub position: i64,
    pub heading: String,
    pub synopsis: String,
    pub created_at: DateTime<Utc>,
}

impl Scene {
    pub fn from_row(row: &Row) -> rusqlite::Result<Self> {
        let created_at: String = row.get(5)?;
        Ok(Scene {
            id: row.get(0)?,
            project_id: row.get(1)?,
            position: row.get(2)?,
            heading: row.get(3)?,
            synopsis: row.get(4)?,
            created_at: parse_timestamp(&created_at, 5)?,
        })
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct Shot {
    pub id: i64,
    pub scene_id: i64,
    pub project_id: i64,
    pub position: i64,
    pub description: String,
    pub camera: String,
    pub duration_secs: f64,
    pub dialogue: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl Shot {
    pub fn from_row(row: &Row) -> rusqlite::Result<Self> {
        let created_at: String = row.get(8)?;
        Ok(Shot {
            id: row.get(0)?,
            scene_id: row.get(1)?,
            project_id: row.get(2)?,
            position: row.get(3)?,
            description: row.get(4)?,
            camera: row.get(5)?,
            duration_secs: row.get(6)?,
            dialogue: row.get(7)?,
            created_at: parse_timestamp(&created_at, 8)?,
        })
    }
}

/// New scene; without a position it is appended after the last scene.
#[derive(Debug, Clone, Deserialize)]
pub struct NewScene {
    pub heading: String,
    #[serde(default)]
    pub synopsis: String,
    #[serde(default)]
    pub position: Option<i64>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct SceneUpdate {
    pub heading: Option<String>,
    pub synopsis: Option<String>,
    pub position: Option<i64>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct NewShot {
    pub description: String,
    #[serde(default)]
    pub camera: String,
    pub duration_secs: f64,
    #[serde(default)]
    pub dialogue: Option<String>,
    #[serde(default)]
    pub position: Option<i64>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ShotUpdate {
    pub description: Option<String>,
    pub camera: Option<String>,
    pub duration_secs: Option<f64>,
    pub dialogue: Option<String>,
    pub position: Option<i64>,
}

const SCENE_COLUMNS: &str = "id, project_id, position, heading, synopsis, created_at";
const SHOT_COLUMNS: &str =
    "id, scene_id, project_id, position, description, camera, duration_secs, dialogue, created_at";

fn insert_scene(conn: &Connection, project_id: i64, scene: &NewScene) -> rusqlite::Result<i64> {
    let position = match scene.position {
        Some(position) => position,
        None => conn.query_row(
            "SELECT COALESCE(MAX(position) + 1, 0) FROM scenes WHERE project_id = ?1",
            params![project_id],
            |row| row.get(0),
        )?,
    };
    conn.execute(
        "INSERT INTO scenes (project_id, position, heading, synopsis, created_at)
         VALUES (?1, ?2, ?3, ?4, ?5)",
        params![project_id, position, scene.heading, scene.synopsis, now()],
    )?;
    Ok(conn.last_insert_rowid())
}

fn insert_shot(
    conn: &Connection,
    project_id: i64,
    scene_id: i64,
    shot: &NewShot,
) -> rusqlite::Result<i64> {
    let position = match shot.position {
        Some(position) => position,
        None => conn.query_row(
            "SELECT COALESCE(MAX(position) + 1, 0) FROM shots WHERE scene_id = ?1",
            params![scene_id],
            |row| row.get(0),
        )?,
    };
    conn.execute(
        "INSERT INTO shots (scene_id, project_id, position, description, camera, duration_secs, dialogue, created_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
        params![
            scene_id,
            project_id,
            position,
            shot.description,
            shot.camera,
            shot.duration_secs,
            shot.dialogue,
            now()
        ],
    )?;
    Ok(conn.last_insert_rowid())
}

impl Database {
    pub fn create_scene(&self, project_id: i64, scene: &NewScene) -> Result<i64> {
        let conn = self.conn()?;
        Ok(insert_scene(&conn, project_id, scene)?)
    }

    pub fn get_scene(&self, id: i64) -> Result<Option<Scene>> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare(&format!("SELECT {} FROM scenes WHERE id = ?1", SCENE_COLUMNS))?;
        let mut rows = stmt.query_map(params![id], |row| Scene::from_row(row))?;

        match rows.next() {
            Some(Ok(scene)) => Ok(Some(scene)),
            Some(Err(e)) => Err(e.into()),
            None => Ok(None),
        }
    }

    pub fn get_scenes_for_project(&self, project_id: i64) -> Result<Vec<Scene>> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare(&format!(
            "SELECT {} FROM scenes WHERE project_id = ?1 ORDER BY position, id",
            SCENE_COLUMNS
        ))?;
        let rows = stmt.query_map(params![project_id], |row| Scene::from_row(row))?;

        let mut scenes = Vec::new();
        for row in rows {
            scenes.push(row?);
        }
        Ok(scenes)
    }

    pub fn update_scene(&self, id: i64, update: &SceneUpdate) -> Result<bool> {
        let conn = self.conn()?;
        let changed = conn.execute(
            "UPDATE scenes SET heading = COALESCE(?1, heading), synopsis = COALESCE(?2, synopsis),
                 position = COALESCE(?3, position)
             WHERE id = ?4",
            params![update.heading, update.synopsis, update.position, id],
        )?;
        Ok(changed > 0)
    }

    pub fn delete_scene(&self, id: i64) -> Result<bool> {
        let conn = self.conn()?;
        let deleted = conn.execute("DELETE FROM scenes WHERE id = ?1", params![id])?;
        Ok(deleted > 0)
    }

    /// The scene's project is copied onto the shot so generations can be
    /// scoped without a join.
    pub fn create_shot(&self, scene_id: i64, shot: &NewShot) -> Result<Option<i64>> {
        let conn = self.conn()?;
        let project_id: Option<i64> = {
            let mut stmt = conn.prepare("SELECT project_id FROM scenes WHERE id = ?1")?;
            let mut rows = stmt.query_map(params![scene_id], |row| row.get(0))?;
            rows.next().transpose()?
        };
        match project_id {
            Some(project_id) => Ok(Some(insert_shot(&conn, project_id, scene_id, shot)?)),
            None => Ok(None),
        }
    }

    pub fn get_shot(&self, id: i64) -> Result<Option<Shot>> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare(&format!("SELECT {} FROM shots WHERE id = ?1", SHOT_COLUMNS))?;
        let mut rows = stmt.query_map(params![id], |row| Shot::from_row(row))?;

        match rows.next() {
            Some(Ok(shot)) => Ok(Some(shot)),
            Some(Err(e)) => Err(e.into()),
            None => Ok(None),
        }
    }

    pub fn get_shots_for_scene(&self, scene_id: i64) -> Result<Vec<Shot>> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare(&format!(
            "SELECT {} FROM shots WHERE scene_id = ?1 ORDER BY position, id",
            SHOT_COLUMNS
        ))?;
        let rows = stmt.query_map(params![scene_id], |row| Shot::from_row(row))?;

        let mut shots = Vec::new();
        for row in rows {
            shots.push(row?);
        }
        Ok(shots)
    }

    /// Shots in screenplay order: by scene position, then shot position.
    pub fn get_shots_for_project(&self, project_id: i64) -> Result<Vec<Shot>> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare(
            "SELECT s.id, s.scene_id, s.project_id, s.position, s.description, s.camera,
                    s.duration_secs, s.dialogue, s.created_at
             FROM shots s
             JOIN scenes sc ON sc.id = s.scene_id
             WHERE s.project_id = ?1
             ORDER BY sc.position, sc.id, s.position, s.id",
        )?;
        let rows = stmt.query_map(params![project_id], |row| Shot::from_row(row))?;

        let mut shots = Vec::new();
        for row in rows {
            shots.push(row?);
        }
        Ok(shots)
    }

    pub fn update_shot(&self, id: i64, update: &ShotUpdate) -> Result<bool> {
        let conn = self.conn()?;
        let changed = conn.execute(
            "UPDATE shots SET description = COALESCE(?1, description), camera = COALESCE(?2, camera),
                 duration_secs = COALESCE(?3, duration_secs), dialogue = COALESCE(?4, dialogue),
                 position = COALESCE(?5, position)
             WHERE id = ?6",
            params![
                update.description,
                update.camera,
                update.duration_secs,
                update.dialogue,
                update.position,
                id
            ],
        )?;
        Ok(changed > 0)
    }

    pub fn delete_shot(&self, id: i64) -> Result<bool> {
        let conn = self.conn()?;
        let deleted = conn.execute("DELETE FROM shots WHERE id = ?1", params![id])?;
        Ok(deleted > 0)
    }

    /// Store `bible` on the project and swap its breakdown for `bible.script`
    /// in one transaction. Existing scenes and their shots are dropped;
    /// generations keep their project but lose the shot link.
    pub fn replace_script_and_bible(&self, project_id: i64, bible: &ProjectBible) -> Result<usize> {
        let mut conn = self.conn()?;
        let tx = conn.transaction()?;

        let updated = tx.execute(
            "UPDATE projects SET bible_json = ?1, updated_at = ?2 WHERE id = ?3",
            params![serde_json::to_string(bible)?, now(), project_id],
        )?;
        if updated == 0 {
            anyhow::bail!("project {} not found", project_id);
        }
        tx.execute("DELETE FROM scenes WHERE project_id = ?1", params![project_id])?;
        let shot_count = insert_breakdown(&tx, project_id, &bible.script)?;

        tx.commit()?;
        Ok(shot_count)
    }
}

fn insert_breakdown(conn: &Connection, project_id: i64, script: &Script) -> Result<usize> {
    let mut shot_count = 0;
    for (scene_index, scene) in script.scenes.iter().enumerate() {
        let scene_id = insert_scene(
            conn,
            project_id,
            &NewScene {
                heading: scene.heading.clone(),
                synopsis: scene.synopsis.clone(),
                position: Some(scene_index as i64),
            },
        )?;
        for (shot_index, shot) in scene.shots.iter().enumerate() {
            insert_shot(
                conn,
                project_id,
                scene_id,
                &NewShot {
                    description: shot.description.clone(),
                    camera: shot.camera.clone(),
                    duration_secs: shot.duration_secs,
                    dialogue: shot.dialogue.clone(),
                    position: Some(shot_index as i64),
                },
            )?;
            shot_count += 1;
        }
    }
    Ok(shot_count)
}

#[cfg(test)]
mod tests {
    use super::*;
    use engine::bible::{ScriptScene, ScriptShot};

    fn shot(description: &str) -> NewShot {
        NewShot {
            description: description.into(),
            camera: String::new(),
            duration_secs: 3.0,
            dialogue: None,
            position: None,
        }
    }

    fn scene(heading: &str, position: Option<i64>) -> NewScene {
        NewScene {
            heading: heading.into(),
            synopsis: String::new(),
            position,
        }
    }

    #[test]
    fn scenes_and_shots_append_in_order() {
        let db = Database::open_in_memory().unwrap();
        let project_id = db.create_project("p", &ProjectBible::default()).unwrap();

        let first = db.create_scene(project_id, &scene("INT. LAB - NIGHT", None)).unwrap();
        let second = db.create_scene(project_id, &scene("EXT. ROOF - DAWN", None)).unwrap();
        assert_eq!(db.get_scene(second).unwrap().unwrap().position, 1);

        let a = db.create_shot(second, &shot("wide")).unwrap().unwrap();
        let b = db.create_shot(first, &shot("close")).unwrap().unwrap();
        let c = db.create_shot(first, &shot("insert")).unwrap().unwrap();
        assert!(db.create_shot(999, &shot("orphan")).unwrap().is_none());

        let ids: Vec<i64> = db
            .get_shots_for_project(project_id)
            .unwrap()
            .iter()
            .map(|s| s.id)
            .collect();
        assert_eq!(ids, vec![b, c, a]);
        assert_eq!(db.get_shot(a).unwrap().unwrap().project_id, project_id);
    }

    #[test]
    fn updates_leave_unset_fields_alone() {
        let db = Database::open_in_memory().unwrap();
        let project_id = db.create_project("p", &ProjectBible::default()).unwrap();
        let scene_id = db.create_scene(project_id, &scene("INT. LAB", None)).unwrap();
        let shot_id = db.create_shot(scene_id, &shot("wide")).unwrap().unwrap();

        let update = ShotUpdate {
            duration_secs: Some(5.5),
            ..Default::default()
        };
        assert!(db.update_shot(shot_id, &update).unwrap());
        let shot = db.get_shot(shot_id).unwrap().unwrap();
        assert_eq!(shot.description, "wide");
        assert_eq!(shot.duration_secs, 5.5);

        assert!(!db.update_scene(999, &SceneUpdate::default()).unwrap());
    }

    #[test]
    fn deleting_a_project_cascades() {
        let db = Database::open_in_memory().unwrap();
        let project_id = db.create_project("p", &ProjectBible::default()).unwrap();
        let scene_id = db.create_scene(project_id, &scene("INT. LAB", None)).unwrap();
        let shot_id = db.create_shot(scene_id, &shot("wide")).unwrap().unwrap();

        db.delete_project(project_id).unwrap();
        assert!(db.get_scene(scene_id).unwrap().is_none());
        assert!(db.get_shot(shot_id).unwrap().is_none());
    }

    #[test]
    fn replace_script_and_bible_swaps_the_breakdown() {
        let db = Database::open_in_memory().unwrap();
        let project_id = db.create_project("p", &ProjectBible::default()).unwrap();
        db.create_scene(project_id, &scene("OLD", None)).unwrap();

        let script = Script {
            scenes: vec![
                ScriptScene {
                    heading: "INT. LAB - NIGHT".into(),
                    synopsis: "Mara finds the drive.".into(),
                    shots: vec![
                        ScriptShot {
                            description: "Mara at the terminal".into(),
                            camera: "slow push-in".into(),
                            duration_secs: 4.0,
                            dialogue: None,
                        },
                        ScriptShot {
                            description: "Drive ejects".into(),
                            camera: "insert".into(),
                            duration_secs: 2.0,
                            dialogue: Some("Got you.".into()),
                        },
                    ],
                },
                ScriptScene {
                    heading: "EXT. ROOF - DAWN".into(),
                    synopsis: String::new(),
                    shots: vec![],
                },
            ],
        };

        let bible = ProjectBible {
            title: "The Drive".into(),
            script,
            ..Default::default()
        };
        assert_eq!(db.replace_script_and_bible(project_id, &bible).unwrap(), 2);
        assert_eq!(db.get_project(project_id).unwrap().unwrap().bible, bible);
        let scenes = db.get_scenes_for_project(project_id).unwrap();
        assert_eq!(
            scenes.iter().map(|s| s.heading.as_str()).collect::<Vec<_>>(),
            vec!["INT. LAB - NIGHT", "EXT. ROOF - DAWN"]
        );
        let shots = db.get_shots_for_scene(scenes[0].id).unwrap();
        assert_eq!(shots[1].dialogue.as_deref(), Some("Got you."));
    }

    #[test]
    fn failed_script_replacement_keeps_bible_and_breakdown() {
        let db = Database::open_in_memory().unwrap();
        let project_id = db.create_project("p", &ProjectBible::default()).unwrap();
        let original = ProjectBible {
            title: "Keep Me".into(),
            script: Script {
                scenes: vec![ScriptScene {
                    heading: "INT. LAB - NIGHT".into(),
                    synopsis: String::new(),
                    shots: vec![ScriptShot {
                        description: "Mara at the terminal".into(),
                        camera: "wide".into(),
                        duration_secs: 4.0,
                        dialogue: None,
                    }],
                }],
            },
            ..Default::default()
        };
        db.replace_script_and_bible(project_id, &original).unwrap();

        let mut broken = original.clone();
        broken.title = "Lost".into();
        broken.script.scenes.push(ScriptScene {
            heading: "EXT. ROOF - DAWN".into(),
            synopsis: String::new(),
            shots: vec![ScriptShot {
                description: "Sunrise".into(),
                camera: "static".into(),
                duration_secs: -1.0,
                dialogue: None,
            }],
        });
        assert!(db.replace_script_and_bible(project_id, &broken).is_err());

        assert_eq!(db.get_project(project_id).unwrap().unwrap().bible, original);
        let scenes = db.get_scenes_for_project(project_id).unwrap();
        assert_eq!(scenes.len(), 1);
        assert_eq!(scenes[0].heading, "INT. LAB - NIGHT");
        assert_eq!(db.get_shots_for_scene(scenes[0].id).unwrap().len(), 1);
    }

    #[test]
    fn replacing_a_missing_projects_script_fails() {
        let db = Database::open_in_memory().unwrap();
        assert!(db
            .replace_script_and_bible(404, &ProjectBible::default())
            .is_err());
    }
}
