/*!
 * Integration tests for reactive_form.
 *
 * Tests are grouped by area:
 * - array: keyed slots and structural edits on FieldArray
 * - tree: nested groups and arrays behaving as one control tree
 * - validation: FormValidator and ValidationTrigger against live trees
 */

use tracing_subscriber::EnvFilter;

#[ctor::ctor]
fn init_test_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::from_default_env().add_directive("reactive_form=info".parse().unwrap()),
        )
        .with_test_writer()
        .try_init();
}

mod tree;
mod validation;
