use reactive_form::form::{AbstractControl, FieldLens, FormModel};

#[derive(Clone, serde::Serialize, serde::Deserialize, reactive_form::form::FormModel)]
struct DemoForm {
    email: String,
}

fn main() {
    let model = DemoForm {
        email: "a@example.com".to_string(),
    };
    let group = model.form_group();
    let lens = DemoForm::fields().email();
    assert_eq!(lens.key().as_str(), "email");

    let field = group.field_by(lens).expect("email field");
    field.set_value("b@example.com".to_string()).expect("set email");
    assert!(group.is_dirty());

    let model = DemoForm::from_group(&group).expect("read model back");
    assert_eq!(model.email, "b@example.com");
}
