/*!
 * Field translation on top of the adaptive scheduler.
 *
 * - `job`: work items for `(field, locale)` pairs and the shared result store
 * - `concurrency`: per-model concurrency caps
 */

pub use self::concurrency::{ModelClass, ModelProfile};
pub use self::job::{
    translate_fields, FieldTranslation, TranslationJob, TranslationMap, TranslationResults,
};

pub mod concurrency;
pub mod job;
