use chrono::Utc;
use clap::Subcommand;
use dayflow_core::Task;

use crate::common::{print_events, print_json, App};

#[derive(Subcommand)]
pub enum TaskAction {
    /// Add a task to the end of the priority order
    Add {
        /// Task title
        title: String,
        /// Planned duration in minutes
        #[arg(long, default_value = "25")]
        minutes: i64,
        /// Cosmetic color tag
        #[arg(long)]
        color: Option<String>,
        /// Cosmetic icon name
        #[arg(long)]
        icon: Option<String>,
    },
    /// List all tasks as JSON
    List,
    /// Mark a task completed
    Done {
        /// Task id
        id: String,
    },
    /// Remove a task
    Remove {
        /// Task id
        id: String,
    },
    /// Set a task's planned duration
    Adjust {
        /// Task id
        id: String,
        /// New planned duration in minutes
        #[arg(long)]
        minutes: i64,
    },
    /// Move a task to a new position in the priority order
    Reorder {
        /// Task id
        id: String,
        /// Target position (0 is first)
        #[arg(long)]
        position: usize,
    },
}

pub fn run(action: TaskAction) -> Result<(), Box<dyn std::error::Error>> {
    let mut app = App::load()?;
    print_events(&app.notices)?;
    let now = Utc::now();

    match action {
        TaskAction::Add {
            title,
            minutes,
            color,
            icon,
        } => {
            let mut task = Task::new(title, minutes * 60);
            task.color_tag = color;
            task.icon = icon;
            let snapshot = task.clone();
            app.plan.add_task(task);
            let events: Vec<_> = app
                .timer
                .resync_first_pending(&app.plan, now)
                .into_iter()
                .collect();
            print_json(&snapshot)?;
            print_events(&events)?;
        }
        TaskAction::List => {
            print_json(&app.plan.tasks)?;
        }
        TaskAction::Done { id } => {
            let events = app.timer.complete_task(&mut app.plan, &id, now);
            if app.plan.task(&id).is_none() {
                return Err(format!("no task with id '{id}'").into());
            }
            print_events(&events)?;
        }
        TaskAction::Remove { id } => {
            if !app.plan.remove_task(&id) {
                return Err(format!("no task with id '{id}'").into());
            }
            let events: Vec<_> = app
                .timer
                .resync_first_pending(&app.plan, now)
                .into_iter()
                .collect();
            print_events(&events)?;
        }
        TaskAction::Adjust { id, minutes } => {
            let Some(task) = app.plan.task_mut(&id) else {
                return Err(format!("no task with id '{id}'").into());
            };
            task.set_planned_duration_secs(minutes * 60);
            let snapshot = task.clone();
            print_json(&snapshot)?;
        }
        TaskAction::Reorder { id, position } => {
            app.plan.reorder_task(&id, position)?;
            let events: Vec<_> = app
                .timer
                .resync_first_pending(&app.plan, now)
                .into_iter()
                .collect();
            print_events(&events)?;
        }
    }

    app.save()?;
    Ok(())
}
