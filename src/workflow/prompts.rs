//! Prompt templates for the LLM-backed grader, generator and rewriter.

use crate::lang::Lang;
use crate::retrieval::RetrievedPassage;

use super::session::{Attempt, Question};

pub fn grading_prompt(question: &Question, passage: &str) -> String {
    match question.lang {
        Lang::Arabic => format!(
            "أنت مُقيّم. مهمتك هي التحقق مما إذا كانت الوثيقة المسترجعة ذات صلة بسؤال المستخدم.\n\
             أجب بكلمة واحدة فقط: 'yes' إذا كانت ذات صلة، 'no' إذا لم تكن كذلك.\n\n\
             الوثيقة: {passage}\n\
             السؤال: {question}\n\n\
             الإجابة:",
            question = question.text
        ),
        Lang::English => format!(
            "You are a grader. Your job is to check if a retrieved document is relevant to a user question.\n\
             Respond with a *single word*: 'yes' if relevant, 'no' if not.\n\n\
             Document: {passage}\n\
             Question: {question}\n\n\
             Answer:",
            question = question.text
        ),
    }
}

pub fn answer_prompt(question: &Question, passages: &[RetrievedPassage]) -> String {
    let context = passages
        .iter()
        .map(|p| p.text.trim())
        .collect::<Vec<_>>()
        .join("\n\n");

    match question.lang {
        Lang::Arabic => format!(
            "أنت مساعد للإجابة على الأسئلة.\n\
             استخدم أجزاء السياق المسترجعة التالية فقط للإجابة على السؤال.\n\
             إذا كنت لا تعرف الإجابة، قل فقط أنك لا تعرف.\n\
             يجب أن تكون الإجابة بالعربية.\n\n\
             السؤال: {question}\n\
             السياق: {context}\n\n\
             الإجابة المفيدة:",
            question = question.text
        ),
        Lang::English => format!(
            "You are an assistant for question-answering tasks.\n\
             Use only the following pieces of retrieved context to answer the question.\n\
             If you don't know the answer, just say that you don't know.\n\
             The answer should be in English.\n\n\
             Question: {question}\n\
             Context: {context}\n\n\
             Helpful Answer:",
            question = question.text
        ),
    }
}

pub fn rewrite_prompt(original: &Question, history: &[Attempt]) -> String {
    let tried = history
        .iter()
        .map(|a| format!("- {} ({} relevant)", a.query.trim(), a.relevant_count()))
        .collect::<Vec<_>>()
        .join("\n");

    match original.lang {
        Lang::Arabic => format!(
            "أنت مُعيد صياغة الاستعلامات. أعد صياغة السؤال التالي ليصبح\n\
             استعلام بحث موجز ومحدد لقاعدة بيانات متجهية.\n\
             الاستعلامات التالية جُرّبت ولم تُرجع نتائج مفيدة، فلا تكررها:\n\
             {tried}\n\
             قدم فقط الاستعلام المُعاد صياغته، لا شيء آخر.\n\n\
             السؤال الأصلي: {question}\n\n\
             الاستعلام المُعاد صياغته:",
            question = original.text
        ),
        Lang::English => format!(
            "You are a query rewriter. Rewrite the following question to be\n\
             a concise and specific search query for a vector database.\n\
             These queries were already tried and found nothing useful; do not repeat them:\n\
             {tried}\n\
             Respond ONLY with the rewritten query, nothing else.\n\n\
             Original Question: {question}\n\n\
             Rewritten Query:",
            question = original.text
        ),
    }
}
