/*!
 * Validation of translated segments.
 *
 * - `markers`: placeholder and glossary markers survive once and in order
 * - `content`: numbers and link targets of the source survive in the final text
 */

pub mod content;
pub mod markers;

pub use content::{ContentCheckResult, ContentValidator};
pub use markers::{MarkerValidationResult, MarkerValidator, extract_markers};
