use std::fmt;
use std::sync::Arc;

use rand::Rng;
use uuid::Uuid;

use crate::entity::common::{FileFormat, ReportSettings};
use crate::entity::object::LeafObject;
use crate::error::{Error, Result};
use crate::template::{Bindings, Template, Value};

/// A synthetic report.
///
/// The shape (level and object count) is drawn once at construction and the
/// XML body is rendered through the template right away and cached, so a
/// report never changes after it is built.
pub struct Report {
    id: Uuid,
    level: u32,
    objects: Vec<LeafObject>,
    template: Arc<dyn Template>,
    xml_rendered: String,
}

impl Report {
    /// Build a report with shape drawn from the thread-local RNG.
    pub fn new(template: Arc<dyn Template>, settings: &ReportSettings) -> Result<Self> {
        Self::with_rng(template, settings, &mut rand::thread_rng())
    }

    /// Build a report with shape drawn from `rng`.
    ///
    /// # Errors
    ///
    /// [`Error::InvalidRange`] for an inverted range and
    /// [`Error::InvalidTemplateCapability`] when the template cannot render
    /// the report's bindings.
    pub fn with_rng<R: Rng + ?Sized>(
        template: Arc<dyn Template>,
        settings: &ReportSettings,
        rng: &mut R,
    ) -> Result<Self> {
        let level = settings.level.sample(rng)?;
        let objects_cnt = settings.objects.sample(rng)?;

        let mut report = Self {
            id: Uuid::new_v4(),
            level,
            objects: (0..objects_cnt).map(|_| LeafObject::new()).collect(),
            template,
            xml_rendered: String::new(),
        };
        report.xml_rendered = report
            .template
            .render(&report.bindings())
            .map_err(Error::InvalidTemplateCapability)?;
        Ok(report)
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn level(&self) -> u32 {
        self.level
    }

    pub fn objects(&self) -> &[LeafObject] {
        &self.objects
    }

    pub fn template(&self) -> &Arc<dyn Template> {
        &self.template
    }

    /// The values a template sees: `id`, `level` and `objects` (each with a `name`).
    pub fn bindings(&self) -> Bindings {
        let objects = self
            .objects
            .iter()
            .map(|object| Value::Map(Bindings::from([("name".to_string(), Value::from(object.name().to_string()))])))
            .collect();

        Bindings::from([
            ("id".to_string(), Value::from(self.id.to_string())),
            ("level".to_string(), Value::from(self.level)),
            ("objects".to_string(), Value::List(objects)),
        ])
    }

    /// The report's body in `format`, encoded as UTF-8.
    pub fn render(&self, format: FileFormat) -> Result<Vec<u8>> {
        match format {
            FileFormat::Xml => Ok(self.xml_rendered.as_bytes().to_vec()),
        }
    }
}

impl fmt::Debug for Report {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Report")
            .field("id", &self.id)
            .field("level", &self.level)
            .field("objects", &self.objects)
            .field("template", &self.template.name())
            .finish()
    }
}
