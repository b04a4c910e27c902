pub const UPLOAD_FORM: &str = r#"<!doctype html>
<title>Upload PDF and JSON</title>
<h1>Upload PDF and JSON Files</h1>
<form method="post" enctype="multipart/form-data">
    <label for="pdf_doc">PDF File:</label>
    <input type="file" id="pdf_doc" name="pdf_doc" accept=".pdf"><br><br>
    <label for="json_doc">JSON File:</label>
    <input type="file" id="json_doc" name="json_doc" accept=".json"><br><br>
    <input type="submit" value="Upload">
</form>
"#;
