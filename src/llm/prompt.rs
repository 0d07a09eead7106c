//! Prompt assembly.

/// Build the grounded prompt sent to the model.
///
/// The model is instructed to answer only from the document; `context` is
/// the output of [`SessionStore::get_full_context`](crate::session::SessionStore::get_full_context).
#[must_use]
pub fn build_prompt(context: &str, question: &str) -> String {
    format!(
        "You are an AI assistant.\n\
         Answer ONLY based on the uploaded document.\n\
         \n\
         {context}\n\
         \n\
         User Question:\n\
         {question}\n"
    )
}
