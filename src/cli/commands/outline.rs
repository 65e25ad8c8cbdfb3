//! Outline command implementation.

use crate::cli::preflight::{self, Operation};
use crate::cli::Output;
use crate::config::Settings;
use crate::orchestrator::Orchestrator;
use anyhow::Result;

/// Run the outline command.
pub async fn run_outline(course: &str, settings: Settings) -> Result<()> {
    if let Err(e) = preflight::check(Operation::Search) {
        Output::error(&format!("{}", e));
        return Err(e.into());
    }

    let orchestrator = Orchestrator::new(settings)?;
    let retrieval = orchestrator.retrieval();

    let title = match retrieval.resolve_course_name(course).await? {
        Some(title) => title,
        None => {
            Output::warning(&format!("No course found matching '{}'", course));
            return Ok(());
        }
    };

    let record = match retrieval.store().get_course(&title).await? {
        Some(record) => record,
        None => {
            Output::warning(&format!("No course found matching '{}'", course));
            return Ok(());
        }
    };

    let course = record.course;
    Output::header(&course.title);
    if let Some(instructor) = &course.instructor {
        Output::kv("Instructor", instructor);
    }
    if let Some(link) = &course.link {
        Output::kv("Link", link);
    }
    println!();
    for lesson in &course.lessons {
        Output::list_item(&format!("Lesson {}: {}", lesson.number, lesson.title));
    }

    Ok(())
}
