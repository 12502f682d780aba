use crate::config::types::Language;
use crate::judge::adapter::JudgeAdapter;
use crate::judge::languages::{cpp::CppAdapter, java::JavaAdapter, python::PythonAdapter};

pub fn adapter_for(language: Language) -> Box<dyn JudgeAdapter> {
    match language {
        Language::Python => Box::new(PythonAdapter),
        Language::Cpp => Box::new(CppAdapter),
        Language::Java => Box::new(JavaAdapter),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_every_language_has_an_adapter() {
        for lang in Language::ALL {
            assert_eq!(adapter_for(lang).language(), lang);
        }
    }

    #[test]
    fn test_only_java_manages_its_own_heap() {
        for lang in Language::ALL {
            assert_eq!(adapter_for(lang).limit_address_space(), lang != Language::Java);
        }
    }
}
