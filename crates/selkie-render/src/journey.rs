use crate::model::{
    Bounds, JourneyActorLayout, JourneyLayout, JourneySectionLayout, JourneyTaskLayout,
};
use crate::{cfg_f64, font_size};
use selkie_core::Config;
use selkie_core::diagrams::journey::JourneyModel;
use selkie_graph::{Point, Rect};
use selkie_layout::position::measure;
use selkie_layout::{TextMeasurer, TextStyle};

const LEGEND_CIRCLE_CX: f64 = 20.0;
const LEGEND_LABEL_X: f64 = 40.0;
const LEGEND_FIRST_Y: f64 = 60.0;
const LEGEND_LINE_STEP_Y: f64 = 20.0;

const SECTION_Y: f64 = 50.0;
const FACE_RADIUS: f64 = 15.0;
const FACE_SCORE_STEP_Y: f64 = 30.0;
const MAX_SCORE: u8 = 5;

/// Tasks run left to right in declaration order under their section headers. Each task's score
/// face hangs below it, one step higher per score point.
pub fn layout_journey_diagram(
    model: &JourneyModel,
    cfg: &Config,
    measurer: &dyn TextMeasurer,
) -> JourneyLayout {
    let task_width = cfg_f64(cfg, "journey.taskWidth", 150.0);
    let task_height = cfg_f64(cfg, "journey.taskHeight", 50.0);
    let task_margin = cfg_f64(cfg, "journey.taskMargin", 50.0);
    let margin_x = cfg_f64(cfg, "journey.diagramMarginX", 50.0);
    let margin_y = cfg_f64(cfg, "journey.diagramMarginY", 10.0);
    let style = TextStyle::sized(font_size(cfg));

    let title_offset = model
        .common
        .title
        .as_deref()
        .map_or(0.0, |t| measure(measurer, t, &style.bold()).1 + margin_y);

    let mut legend_right: f64 = 0.0;
    let actors: Vec<JourneyActorLayout> = model
        .actors()
        .into_iter()
        .enumerate()
        .map(|(i, name)| {
            let y = title_offset + LEGEND_FIRST_Y + i as f64 * LEGEND_LINE_STEP_Y;
            let (w, h) = measure(measurer, name, &style);
            legend_right = legend_right.max(LEGEND_LABEL_X + w);
            JourneyActorLayout {
                name: name.to_string(),
                color_index: i,
                marker: Point::new(LEGEND_CIRCLE_CX, y),
                label: Rect::new(LEGEND_LABEL_X, y - h / 2.0, w, h),
            }
        })
        .collect();

    let left = legend_right.max(margin_x) + task_margin;
    let section_y = title_offset + SECTION_Y;
    let task_y = section_y + task_height + margin_y;
    let face_base = task_y + task_height + task_margin + FACE_RADIUS;

    let tasks: Vec<JourneyTaskLayout> = model
        .tasks
        .iter()
        .enumerate()
        .map(|(i, task)| {
            let rect = Rect::new(
                left + i as f64 * (task_width + task_margin),
                task_y,
                task_width,
                task_height,
            );
            let drop = f64::from(MAX_SCORE.saturating_sub(task.score));
            JourneyTaskLayout {
                name: task.name.clone(),
                section: task.section.clone(),
                score: task.score,
                actors: task.actors.clone(),
                face: Point::new(rect.center().x, face_base + drop * FACE_SCORE_STEP_Y),
                rect,
            }
        })
        .collect();

    let mut sections: Vec<JourneySectionLayout> = Vec::new();
    for task in &tasks {
        let name = task.section.clone().unwrap_or_default();
        match sections.last_mut() {
            Some(last) if last.name == name => {
                last.rect.width = task.rect.max_x() - last.rect.x;
            }
            _ => sections.push(JourneySectionLayout {
                name,
                rect: Rect::new(task.rect.x, section_y, task.rect.width, task_height),
            }),
        }
    }

    let axis_y =
        face_base + f64::from(MAX_SCORE - 1) * FACE_SCORE_STEP_Y + FACE_RADIUS + margin_y;
    let right = tasks
        .last()
        .map_or(left, |t| t.rect.max_x())
        .max(legend_right);
    let bottom = actors
        .iter()
        .map(|a| a.label.max_y())
        .fold(axis_y, f64::max);

    tracing::trace!(tasks = tasks.len(), actors = actors.len(), "journey layout");
    JourneyLayout {
        actors,
        sections,
        tasks,
        axis_y,
        bounds: Bounds {
            min_x: 0.0,
            min_y: 0.0,
            max_x: right + margin_x,
            max_y: bottom + margin_y,
        },
    }
}
